//! Resources managed through the admin backend

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// A backend resource identifier
pub type Id = u64;

/// The language whose translation is shown when none is requested
pub const DEFAULT_LANGUAGE: &str = "ru";

const UNTITLED: &str = "Untitled";
const NO_DESCRIPTION: &str = "No description";

/// Localized text attached to a direction or a doctor
///
/// Directions use the title, description, and offer details. Doctors use
/// the description and the professional background fields.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
    /// The language of this translation, such as `ru` or `en`
    pub language_code: String,
    /// Shown as the heading of a direction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// A free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// What a direction includes for the patient
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_details: Option<String>,
    /// Where the doctor studied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education: Option<String>,
    /// Years and places of practice
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience: Option<String>,
    /// Previous positions held
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_record: Option<String>,
    /// The doctor's field of medicine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
}

impl Translation {
    /// Constructs an empty translation for a language
    pub fn new(language_code: impl Into<String>) -> Self {
        Self {
            language_code: language_code.into(),
            ..Self::default()
        }
    }

    fn placeholder(language_code: &str) -> Self {
        Self {
            title: Some(UNTITLED.to_owned()),
            description: Some(NO_DESCRIPTION.to_owned()),
            ..Self::new(language_code)
        }
    }

    /// The multipart fields carried by this translation, by wire name
    pub(crate) fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("title", &self.title),
            ("description", &self.description),
            ("offerDetails", &self.offer_details),
            ("education", &self.education),
            ("experience", &self.experience),
            ("serviceRecord", &self.service_record),
            ("specialization", &self.specialization),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|v| (name, v)))
    }
}

/// A resource carrying translations
pub trait Translated {
    /// All translations of the resource
    fn translations(&self) -> &[Translation];

    /// The translation for `language`
    ///
    /// Falls back to the first translation, then to a placeholder with a
    /// generic title and description.
    fn translation(&self, language: &str) -> Cow<'_, Translation> {
        let translations = self.translations();
        translations
            .iter()
            .find(|t| t.language_code == language)
            .or_else(|| translations.first())
            .map_or_else(|| Cow::Owned(Translation::placeholder(language)), Cow::Borrowed)
    }
}

/// A medical direction offered by the clinic
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Direction {
    /// The backend identifier
    pub id: Id,
    /// The URL of the direction's image
    #[serde(default)]
    pub direction_image: Option<String>,
    /// Localized text, one entry per language
    #[serde(default)]
    pub translations: Vec<Translation>,
}

impl Translated for Direction {
    fn translations(&self) -> &[Translation] {
        &self.translations
    }
}

/// A doctor practicing at the clinic
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    /// The backend identifier
    pub id: Id,
    /// The given name
    pub first_name: String,
    /// The family name
    pub last_name: String,
    /// The patronymic, if any
    #[serde(default)]
    pub middle_name: Option<String>,
    /// The URL of the doctor's photo
    #[serde(default)]
    pub profile_image: Option<String>,
    /// Localized text, one entry per language
    #[serde(default)]
    pub translations: Vec<Translation>,
}

impl Doctor {
    /// The doctor's name as `last first middle`
    pub fn full_name(&self) -> String {
        let mut name = format!("{} {}", self.last_name, self.first_name);
        if let Some(middle) = self.middle_name.as_deref().filter(|m| !m.is_empty()) {
            name.push(' ');
            name.push_str(middle);
        }
        name
    }
}

impl Translated for Doctor {
    fn translations(&self) -> &[Translation] {
        &self.translations
    }
}

/// A review left by a patient
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// The backend identifier
    pub id: Id,
    /// The patient's name
    pub name: String,
    /// The patient's phone number
    #[serde(default)]
    pub phone: Option<String>,
    /// The text of the review
    pub message: String,
    /// When the review was left, as sent by the backend
    #[serde(default)]
    pub created_at: Option<String>,
}

/// A sort order applied to a page
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct Sort {
    pub direction: String,
    pub property: String,
    #[serde(default)]
    pub null_handling: Option<String>,
    #[serde(default)]
    pub ascending: bool,
    #[serde(default)]
    pub ignore_case: bool,
}

/// The request that produced a page
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct Pageable {
    pub page_number: u32,
    pub page_size: u32,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub paged: bool,
    #[serde(default)]
    pub unpaged: bool,
}

/// The position of a page within its collection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// The requested page size
    pub size: u32,
    /// The zero-based page number
    pub number: u32,
    /// The number of elements across all pages
    pub total_elements: u64,
    /// The number of pages
    pub total_pages: u32,
}

impl PageInfo {
    /// Whether this is the first page
    pub fn is_first(&self) -> bool {
        self.number == 0
    }

    /// Whether this is the last page
    pub fn is_last(&self) -> bool {
        self.number + 1 >= self.total_pages
    }
}

/// One page of a paged collection
///
/// Both the flat page layout (`totalPages`, `number`, … beside `content`)
/// and the nested layout (`page: {…}`) are accepted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    rename_all = "camelCase",
    from = "RawPage<T>",
    bound(deserialize = "T: Deserialize<'de>")
)]
pub struct PageResponse<T> {
    /// The elements on this page
    pub content: Vec<T>,
    /// The position of this page
    pub page: PageInfo,
    /// The sort orders applied, if reported
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<Sort>,
    /// The request that produced this page, if reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pageable: Option<Pageable>,
}

impl<T> PageResponse<T> {
    /// Whether this page holds no elements
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPage<T> {
    #[serde(default = "Vec::new")]
    content: Vec<T>,
    #[serde(default)]
    page: Option<PageInfo>,
    #[serde(default)]
    size: u32,
    #[serde(default)]
    number: u32,
    #[serde(default)]
    total_elements: u64,
    #[serde(default)]
    total_pages: u32,
    #[serde(default)]
    sort: Option<SortField>,
    #[serde(default)]
    pageable: Option<PageableField>,
}

// Spring reports an unsorted page as an object rather than a list.
#[derive(Deserialize)]
#[serde(untagged)]
enum SortField {
    List(Vec<Sort>),
    Other(serde::de::IgnoredAny),
}

// Spring reports an unpaged request as the string `"INSTANCE"`.
#[derive(Deserialize)]
#[serde(untagged)]
enum PageableField {
    Paged(Pageable),
    Other(serde::de::IgnoredAny),
}

impl<T> From<RawPage<T>> for PageResponse<T> {
    fn from(raw: RawPage<T>) -> Self {
        let page = raw.page.unwrap_or(PageInfo {
            size: raw.size,
            number: raw.number,
            total_elements: raw.total_elements,
            total_pages: raw.total_pages,
        });
        let sort = match raw.sort {
            Some(SortField::List(sort)) => sort,
            Some(SortField::Other(_)) | None => Vec::new(),
        };
        let pageable = match raw.pageable {
            Some(PageableField::Paged(pageable)) => Some(pageable),
            Some(PageableField::Other(_)) | None => None,
        };
        Self {
            content: raw.content,
            page,
            sort,
            pageable,
        }
    }
}
