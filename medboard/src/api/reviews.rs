use super::{item_path, PageRequest};
use crate::{
    model::{Id, PageResponse, Review},
    AdminClient, ApiError,
};

const PATH: &str = "reviews";

/// Moderation of patient reviews
#[derive(Clone, Copy, Debug)]
pub struct Reviews<'a> {
    client: &'a AdminClient,
}

impl<'a> Reviews<'a> {
    pub(crate) fn new(client: &'a AdminClient) -> Self {
        Self { client }
    }

    /// Lists one page of reviews
    pub async fn list(&self, page: PageRequest) -> Result<PageResponse<Review>, ApiError> {
        self.client.get_json(PATH, Some(&page)).await
    }

    /// Deletes a review
    pub async fn delete(&self, id: Id) -> Result<(), ApiError> {
        self.client.delete(&item_path(PATH, id)).await
    }
}
