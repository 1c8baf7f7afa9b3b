//! The mutually exclusive top-level view regions.

use serde::{Deserialize, Serialize};

/// Top-level view the application shows. Exactly one is active at a
/// time; the router selects it from the current facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewRegion {
    /// Auth state or onboarding status still resolving.
    Loading,
    /// Signed out: login and sign-up forms.
    LoginArea,
    /// Signed in but no company profile yet: the company form.
    OnboardingArea,
    /// Admin dashboard and review views.
    AdminArea,
    /// Regular user dashboard, submission form, profile.
    UserArea,
    /// Explicit not-found page inside an area.
    NotFound,
}

impl std::fmt::Display for ViewRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Loading => "loading",
            Self::LoginArea => "login_area",
            Self::OnboardingArea => "onboarding_area",
            Self::AdminArea => "admin_area",
            Self::UserArea => "user_area",
            Self::NotFound => "not_found",
        };
        write!(f, "{s}")
    }
}
