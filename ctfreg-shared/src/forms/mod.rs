/// Registration forms
///
/// A registration is submitted as one request but validated and saved by two
/// forms:
///
/// - [`UserCredentialsForm`]: username, password and formal email; always
///   saves the user as inactive and sends the confirmation mail
/// - [`TeamProfileForm`]: informal email, optional image and country; saves
///   the team for an already persisted user
///
/// The caller validates both, saves the user form first, passes the saved
/// user to the team form and finally asks the user form to send the mail:
///
/// ```no_run
/// use ctfreg_shared::forms::{TeamProfileForm, UserCredentialsForm};
/// # use ctfreg_shared::error::RegistrationError;
/// # use ctfreg_shared::mail::{ConfirmationMailer, RequestSite};
/// # use ctfreg_shared::media::MediaStorage;
/// # use ctfreg_shared::store::RegistrationStore;
/// # async fn example(
/// #     mut user_form: UserCredentialsForm,
/// #     team_form: TeamProfileForm,
/// #     store: &dyn RegistrationStore,
/// #     media: &MediaStorage,
/// #     confirmation: &ConfirmationMailer,
/// #     site: &RequestSite,
/// # ) -> Result<(), RegistrationError> {
/// let mut errors = user_form.errors(store).await?;
/// errors.merge(team_form.errors());
/// errors.into_result()?;
///
/// let user = user_form.save(store).await?;
/// team_form.save(store, media, &user).await?;
/// user_form.send_confirmation_mail(site, confirmation).await?;
/// # Ok(())
/// # }
/// ```

mod team;
mod user;

pub use team::{TeamProfileData, TeamProfileForm};
pub use user::{UserCredentialsData, UserCredentialsForm};

use serde::Serialize;

/// Message for missing required fields
pub const REQUIRED: &str = "This field is required.";

/// Kind of input a field expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Password,
    Email,
    Image,
}

/// Static description of a form field, for rendering the form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_text: Option<&'static str>,
    pub required: bool,
    pub kind: FieldKind,
}
