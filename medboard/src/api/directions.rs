use reqwest::Method;

use super::{item_path, PageRequest};
use crate::{
    form::DirectionForm,
    model::{Direction, Id, PageResponse},
    AdminClient, ApiError,
};

const PATH: &str = "directions";

/// Operations on medical directions
#[derive(Clone, Copy, Debug)]
pub struct Directions<'a> {
    client: &'a AdminClient,
}

impl<'a> Directions<'a> {
    pub(crate) fn new(client: &'a AdminClient) -> Self {
        Self { client }
    }

    /// Lists one page of directions
    pub async fn list(&self, page: PageRequest) -> Result<PageResponse<Direction>, ApiError> {
        self.client.get_json(PATH, Some(&page)).await
    }

    /// Fetches a single direction
    pub async fn get(&self, id: Id) -> Result<Direction, ApiError> {
        self.client
            .get_json::<_, PageRequest>(&item_path(PATH, id), None)
            .await
    }

    /// Creates a direction
    pub async fn create(&self, form: &DirectionForm) -> Result<Direction, ApiError> {
        self.client.send_multipart(Method::POST, PATH, form).await
    }

    /// Replaces a direction's content
    pub async fn update(&self, id: Id, form: &DirectionForm) -> Result<Direction, ApiError> {
        self.client
            .send_multipart(Method::PUT, &item_path(PATH, id), form)
            .await
    }

    /// Deletes a direction
    pub async fn delete(&self, id: Id) -> Result<(), ApiError> {
        self.client.delete(&item_path(PATH, id)).await
    }
}
