//! Static sub-route tables for the user and admin areas.
//!
//! Plain path lookups, no state machine: each area maps a path to a page
//! or redirects to its default. Admin pages additionally require the
//! admin role, which the region decision already guarantees.

/// Path of the company onboarding form.
pub const COMPANY_FORM_PATH: &str = "/company-form";

/// Default landing path per area.
pub const USER_DEFAULT_PATH: &str = "/";
pub const ADMIN_DEFAULT_PATH: &str = "/admin";

/// Pages inside the regular-user area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserPage {
    Dashboard,
    DataEntry,
    Profile,
    CompanyForm,
}

/// Pages inside the admin area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminPage {
    Dashboard,
    Profile,
}

/// Result of resolving a path inside an area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome<P> {
    /// The path maps to a page.
    Page(P),
    /// Unmatched path: redirect to the area default.
    Redirect(&'static str),
    /// The explicit not-found page.
    NotFound,
}

/// Resolve a path in the regular-user area.
pub fn resolve_user(path: &str) -> RouteOutcome<UserPage> {
    match path {
        "/" => RouteOutcome::Page(UserPage::Dashboard),
        "/submit" => RouteOutcome::Page(UserPage::DataEntry),
        "/profile" => RouteOutcome::Page(UserPage::Profile),
        COMPANY_FORM_PATH => RouteOutcome::Page(UserPage::CompanyForm),
        "/404" => RouteOutcome::NotFound,
        _ => RouteOutcome::Redirect(USER_DEFAULT_PATH),
    }
}

/// Resolve a path in the admin area.
pub fn resolve_admin(path: &str) -> RouteOutcome<AdminPage> {
    match path {
        ADMIN_DEFAULT_PATH => RouteOutcome::Page(AdminPage::Dashboard),
        "/profile" => RouteOutcome::Page(AdminPage::Profile),
        _ => RouteOutcome::Redirect(ADMIN_DEFAULT_PATH),
    }
}
