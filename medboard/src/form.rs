//! Multipart payloads for creating and updating resources
//!
//! A multipart body is streamed and cannot be replayed by the refresh
//! middleware, so these payloads own their data and can be rendered into a
//! fresh [`Form`] as often as needed.

use std::path::Path;

use reqwest::multipart::{Form, Part};

use crate::{model::Translation, ApiError};

/// An image to upload alongside a resource
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageUpload {
    file_name: String,
    mime: Option<String>,
    bytes: Vec<u8>,
}

impl ImageUpload {
    /// Constructs an upload from raw bytes
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            mime: None,
            bytes: bytes.into(),
        }
    }

    /// Sets the MIME type sent with the image
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    /// Reads an image from disk
    ///
    /// The MIME type is guessed from common image extensions.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ApiError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_owned());

        let mime = match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("jpg" | "jpeg") => Some("image/jpeg"),
            Some("png") => Some("image/png"),
            Some("webp") => Some("image/webp"),
            Some("gif") => Some("image/gif"),
            _ => None,
        };

        Ok(Self {
            file_name,
            mime: mime.map(str::to_owned),
            bytes,
        })
    }

    fn to_part(&self) -> Result<Part, ApiError> {
        let part = Part::bytes(self.bytes.clone()).file_name(self.file_name.clone());
        match &self.mime {
            Some(mime) => Ok(part.mime_str(mime)?),
            None => Ok(part),
        }
    }
}

/// What happens to the stored image on update
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ImageChange {
    /// The stored image is left as is
    #[default]
    Keep,
    /// The stored image is replaced
    Replace(ImageUpload),
    /// The stored image is removed
    Remove,
}

/// A payload that can be rendered as a multipart form
pub trait MultipartPayload {
    /// The name of the file part carrying the image
    const IMAGE_FIELD: &'static str;

    /// The scalar and translation fields, by wire name
    fn fields(&self) -> Vec<(String, String)>;

    /// The change to the stored image
    fn image(&self) -> &ImageChange;

    /// All text parts of the form, including the image removal flag
    fn text_fields(&self) -> Vec<(String, String)> {
        let mut fields = self.fields();
        if *self.image() == ImageChange::Remove {
            fields.push(("removeImage".to_owned(), "true".to_owned()));
        }
        fields
    }

    /// Renders a fresh form
    fn to_form(&self) -> Result<Form, ApiError> {
        let form = self
            .text_fields()
            .into_iter()
            .fold(Form::new(), |form, (name, value)| form.text(name, value));

        match self.image() {
            ImageChange::Replace(image) => Ok(form.part(Self::IMAGE_FIELD, image.to_part()?)),
            ImageChange::Keep | ImageChange::Remove => Ok(form),
        }
    }
}

fn translation_fields(translations: &[Translation]) -> impl Iterator<Item = (String, String)> + '_ {
    translations.iter().enumerate().flat_map(|(i, translation)| {
        std::iter::once((
            format!("translations[{i}].languageCode"),
            translation.language_code.clone(),
        ))
        .chain(
            translation
                .fields()
                .map(move |(field, value)| (format!("translations[{i}].{field}"), value.to_owned())),
        )
    })
}

/// The editable content of a direction
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DirectionForm {
    /// Localized text, one entry per language
    pub translations: Vec<Translation>,
    /// The change to the direction's image
    pub image: ImageChange,
}

impl MultipartPayload for DirectionForm {
    const IMAGE_FIELD: &'static str = "directionImage";

    fn fields(&self) -> Vec<(String, String)> {
        translation_fields(&self.translations).collect()
    }

    fn image(&self) -> &ImageChange {
        &self.image
    }
}

/// The editable content of a doctor
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DoctorForm {
    /// The given name
    pub first_name: String,
    /// The family name
    pub last_name: String,
    /// The patronymic, empty if none
    pub middle_name: String,
    /// Localized text, one entry per language
    pub translations: Vec<Translation>,
    /// The change to the doctor's photo
    pub image: ImageChange,
}

impl MultipartPayload for DoctorForm {
    const IMAGE_FIELD: &'static str = "profileImage";

    fn fields(&self) -> Vec<(String, String)> {
        [
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
            ("middleName", &self.middle_name),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_owned(), value.clone()))
        .chain(translation_fields(&self.translations))
        .collect()
    }

    fn image(&self) -> &ImageChange {
        &self.image
    }
}
