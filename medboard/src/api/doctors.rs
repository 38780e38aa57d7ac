use reqwest::Method;

use super::{item_path, PageRequest};
use crate::{
    form::DoctorForm,
    model::{Doctor, Id, PageResponse},
    AdminClient, ApiError,
};

const PATH: &str = "doctors";

/// Operations on doctors
#[derive(Clone, Copy, Debug)]
pub struct Doctors<'a> {
    client: &'a AdminClient,
}

impl<'a> Doctors<'a> {
    pub(crate) fn new(client: &'a AdminClient) -> Self {
        Self { client }
    }

    /// Lists one page of doctors
    pub async fn list(&self, page: PageRequest) -> Result<PageResponse<Doctor>, ApiError> {
        self.client.get_json(PATH, Some(&page)).await
    }

    /// Fetches a single doctor
    pub async fn get(&self, id: Id) -> Result<Doctor, ApiError> {
        self.client
            .get_json::<_, PageRequest>(&item_path(PATH, id), None)
            .await
    }

    /// Creates a doctor
    pub async fn create(&self, form: &DoctorForm) -> Result<Doctor, ApiError> {
        self.client.send_multipart(Method::POST, PATH, form).await
    }

    /// Replaces a doctor's content
    pub async fn update(&self, id: Id, form: &DoctorForm) -> Result<Doctor, ApiError> {
        self.client
            .send_multipart(Method::PUT, &item_path(PATH, id), form)
            .await
    }

    /// Deletes a doctor
    pub async fn delete(&self, id: Id) -> Result<(), ApiError> {
        self.client.delete(&item_path(PATH, id)).await
    }
}
