use super::{FieldDescriptor, FieldKind, REQUIRED};
use crate::error::{FormErrors, RegistrationResult};
use crate::media::{check_image, team_image_path, ImageUpload, MediaStorage, DEFAULT_MAX_IMAGE_BYTES};
use crate::models::{
    team::{NewTeam, Team},
    user::User,
};
use crate::store::RegistrationStore;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

const FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor {
        name: "informal_email",
        label: "Informal email",
        help_text: Some(
            "A less authorative contact address, e.g. your team's mailing list. It will \
             receive all relevant information for participants.",
        ),
        required: true,
        kind: FieldKind::Email,
    },
    FieldDescriptor {
        name: "image",
        label: "Image",
        help_text: Some("Optional. Your logo or similar."),
        required: false,
        kind: FieldKind::Image,
    },
    FieldDescriptor {
        name: "country",
        label: "Country",
        help_text: None,
        required: true,
        kind: FieldKind::Text,
    },
];

/// Raw text input of the team portion of a registration
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct TeamProfileData {
    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 254, message = "Ensure this value has at most 254 characters.")
    )]
    pub informal_email: String,

    #[validate(length(max = 100, message = "Ensure this value has at most 100 characters."))]
    pub country: String,
}

impl TeamProfileData {
    pub fn new(informal_email: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            informal_email: informal_email.into().trim().to_string(),
            country: country.into().trim().to_string(),
        }
    }
}

/// The portion of the registration stored in the team record
///
/// The owning user is not part of the input: it is handed to
/// [`save`](Self::save) by the caller after the user has been persisted.
#[derive(Debug, Clone)]
pub struct TeamProfileForm {
    data: TeamProfileData,
    image: Option<ImageUpload>,
    image_id: Uuid,
    max_image_bytes: usize,
}

impl TeamProfileForm {
    pub fn new(data: TeamProfileData) -> Self {
        Self {
            data: TeamProfileData::new(data.informal_email, data.country),
            image: None,
            image_id: Uuid::new_v4(),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }

    /// Attaches an uploaded image
    pub fn with_image(mut self, image: Option<ImageUpload>) -> Self {
        self.image = image;
        self
    }

    pub fn with_max_image_bytes(mut self, max_image_bytes: usize) -> Self {
        self.max_image_bytes = max_image_bytes;
        self
    }

    /// Field descriptions, in display order
    pub fn fields() -> &'static [FieldDescriptor] {
        FIELDS
    }

    pub fn errors(&self) -> FormErrors {
        let mut errors = FormErrors::new();

        if self.data.informal_email.is_empty() {
            errors.add("informal_email", REQUIRED);
        }
        if self.data.country.is_empty() {
            errors.add("country", REQUIRED);
        }

        if let Err(validation) = self.data.validate() {
            for (field, message) in FormErrors::from(validation).iter() {
                if !errors.contains(field) {
                    errors.add(field, message);
                }
            }
        }

        if let Some(image) = &self.image {
            if let Err(rejection) = check_image(image, self.max_image_bytes) {
                errors.add("image", rejection.to_string());
            }
        }

        errors
    }

    pub fn is_valid(&self) -> bool {
        self.errors().is_empty()
    }

    /// Media path the image will be stored under, if an image was uploaded
    fn image_path(&self) -> RegistrationResult<Option<String>> {
        let Some(image) = &self.image else {
            return Ok(None);
        };

        let extension = check_image(image, self.max_image_bytes).map_err(|rejection| {
            let mut errors = FormErrors::new();
            errors.add("image", rejection.to_string());
            errors
        })?;

        Ok(Some(team_image_path(self.image_id, extension)))
    }

    /// Builds the team record for `user` without persisting it
    pub fn build(&self, user: &User) -> RegistrationResult<NewTeam> {
        Ok(NewTeam {
            user_id: user.id,
            informal_email: self.data.informal_email.clone(),
            image: self.image_path()?,
            country: self.data.country.clone(),
        })
    }

    /// Validates and persists the team, owned by `user`
    ///
    /// The image, if any, is written to media storage before the record and
    /// removed again if the record cannot be stored.
    pub async fn save(
        &self,
        store: &dyn RegistrationStore,
        media: &MediaStorage,
        user: &User,
    ) -> RegistrationResult<Team> {
        self.errors().into_result()?;

        let new_team = self.build(user)?;
        if let (Some(path), Some(image)) = (&new_team.image, &self.image) {
            media.store(path, &image.data).await?;
        }

        let image_path = new_team.image.clone();
        let team = match store.insert_team(new_team).await {
            Ok(team) => team,
            Err(e) => {
                if let Some(path) = image_path {
                    if let Err(remove_err) = media.remove(&path).await {
                        warn!(error = %remove_err, "Failed to remove image of unsaved team");
                    }
                }
                return Err(e.into());
            }
        };

        info!(team_id = %team.id, user_id = %user.id, "Saved team");
        Ok(team)
    }
}
