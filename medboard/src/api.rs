//! Typed access to the business endpoints

use serde::{Deserialize, Serialize};

mod directions;
mod doctors;
mod reviews;

pub use directions::Directions;
pub use doctors::Doctors;
pub use reviews::Reviews;

/// The number of elements per page used when none is requested
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// A request for one page of a collection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// The zero-based page number
    pub page: u32,
    /// The number of elements per page
    pub size: u32,
}

impl PageRequest {
    /// Requests the given page with the default page size
    pub const fn new(page: u32) -> Self {
        Self {
            page,
            size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Sets the page size
    pub const fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0)
    }
}

fn item_path(collection: &str, id: crate::model::Id) -> String {
    format!("{collection}/{id}")
}
