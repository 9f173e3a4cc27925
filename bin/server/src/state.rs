//! Shared application state handed to every handler.

use crate::auth::TokenIssuer;
use crate::mail::Mailer;
use blogmate::ai::AiFacade;
use blogmate::content::ContentStore;
use blogmate::service::Blocking;
use blogmate::users::UserDirectory;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub content: Blocking<ContentStore>,
    pub users: Blocking<UserDirectory>,
    pub ai: Arc<AiFacade>,
    pub tokens: Arc<TokenIssuer>,
    pub mailer: Arc<dyn Mailer>,
    /// Base URL used in emailed links.
    pub public_url: Arc<str>,
}
