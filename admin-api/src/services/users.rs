//! User listing and role management on top of the directory seam.
//!
//! The upstream directory only pages by cursor and size; the email and
//! disabled filters here are applied in memory after each fetch. A dedicated
//! cursor encoding lets a filtered listing resume mid-page without repeating
//! or skipping records.

use std::str::FromStr;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::dtos::{ListUsersResponse, ListedUser};
use crate::error::AppError;
use crate::services::directory::{DirectoryUser, UserDirectory};

/// Prefix marking a cursor as this service's filtered encoding rather than an
/// upstream-native token.
const FILTERED_CURSOR_PREFIX: &str = "flt1.";

const DEFAULT_PAGE_SIZE: i64 = 100;
const MAX_PAGE_SIZE: i64 = 1000;

/// Continuation cursor for a listing.
///
/// `Native` wraps the upstream token verbatim; `Filtered` additionally carries
/// the position inside one upstream page's filtered view. Decoding is lenient:
/// anything that does not parse as a filtered cursor is passed through as
/// native, so stale or foreign tokens degrade instead of failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCursor {
    Native(String),
    Filtered {
        /// Token of the upstream page the offset applies to; `None` means the
        /// first page.
        upstream: Option<String>,
        /// Entries of that page's filtered view already returned.
        offset: usize,
    },
}

#[derive(Serialize, Deserialize)]
struct FilteredCursorRepr {
    #[serde(skip_serializing_if = "Option::is_none")]
    t: Option<String>,
    o: usize,
}

impl PageCursor {
    pub fn decode(raw: &str) -> Self {
        let Some(encoded) = raw.strip_prefix(FILTERED_CURSOR_PREFIX) else {
            return PageCursor::Native(raw.to_string());
        };
        let Ok(bytes) = URL_SAFE_NO_PAD.decode(encoded) else {
            return PageCursor::Native(raw.to_string());
        };
        match serde_json::from_slice::<FilteredCursorRepr>(&bytes) {
            Ok(repr) => PageCursor::Filtered {
                upstream: repr.t,
                offset: repr.o,
            },
            Err(_) => PageCursor::Native(raw.to_string()),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            PageCursor::Native(token) => token.clone(),
            PageCursor::Filtered { upstream, offset } => {
                let repr = FilteredCursorRepr {
                    t: upstream.clone(),
                    o: *offset,
                };
                // Serializing a two-field struct cannot fail.
                let json = serde_json::to_vec(&repr).unwrap_or_default();
                format!("{}{}", FILTERED_CURSOR_PREFIX, URL_SAFE_NO_PAD.encode(json))
            }
        }
    }
}

/// Fixed role tiers the console can assign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Owner,
    Admin,
    Editor,
    Viewer,
    User,
}

impl Role {
    /// Claim value stored under the `role` key; `None` for the default tier,
    /// which is represented by removing the key.
    pub fn claim_value(self) -> Option<&'static str> {
        match self {
            Role::Owner => Some("Owner"),
            Role::Admin => Some("Admin"),
            Role::Editor => Some("Editor"),
            Role::Viewer => Some("Viewer"),
            Role::User => None,
        }
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Owner" => Ok(Role::Owner),
            "Admin" => Ok(Role::Admin),
            "Editor" => Ok(Role::Editor),
            "Viewer" => Ok(Role::Viewer),
            "User" => Ok(Role::User),
            other => Err(AppError::InvalidRole(other.to_string())),
        }
    }
}

/// Validated parameters for one listing request.
#[derive(Debug, Default, Clone)]
pub struct ListUsersParams {
    pub page_size: Option<i64>,
    pub page_token: Option<String>,
    pub email_contains: Option<String>,
    pub disabled: Option<bool>,
}

impl ListUsersParams {
    /// An empty `emailContains` is treated as no filter.
    fn has_filter(&self) -> bool {
        self.email_filter().is_some() || self.disabled.is_some()
    }

    fn email_filter(&self) -> Option<&str> {
        self.email_contains.as_deref().filter(|s| !s.is_empty())
    }
}

#[derive(Clone)]
pub struct UserService {
    directory: Arc<dyn UserDirectory>,
    max_scan_pages: usize,
}

impl UserService {
    pub fn new(directory: Arc<dyn UserDirectory>, max_scan_pages: usize) -> Self {
        Self {
            directory,
            // A cap of zero would never fetch anything.
            max_scan_pages: max_scan_pages.max(1),
        }
    }

    /// List one page of users, applying the optional filters.
    ///
    /// Without filters this is a single pass-through call and the upstream
    /// token is returned verbatim. With a filter active, up to
    /// `max_scan_pages` upstream pages are scanned per request; hitting the
    /// cap yields a short page that still carries a continuation cursor, so a
    /// short non-final page means "ask again", not "no more matches".
    pub async fn list_users(&self, params: ListUsersParams) -> Result<ListUsersResponse, AppError> {
        let page_size = params
            .page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE) as usize;

        if !params.has_filter() {
            let page = self
                .directory
                .list_page(page_size, params.page_token.as_deref())
                .await?;
            let users: Vec<ListedUser> = page.users.into_iter().map(ListedUser::from).collect();
            return Ok(ListUsersResponse {
                count: users.len(),
                next_page_token: page.next_page_token,
                users,
            });
        }

        self.list_filtered(page_size, params).await
    }

    async fn list_filtered(
        &self,
        page_size: usize,
        params: ListUsersParams,
    ) -> Result<ListUsersResponse, AppError> {
        let (mut upstream_cursor, mut offset) = match params.page_token.as_deref() {
            Some(raw) => match PageCursor::decode(raw) {
                PageCursor::Filtered { upstream, offset } => (upstream, offset),
                PageCursor::Native(token) => (Some(token), 0),
            },
            None => (None, 0),
        };

        let mut users: Vec<ListedUser> = Vec::with_capacity(page_size);

        for _ in 0..self.max_scan_pages {
            let page_start = upstream_cursor.clone();
            let page = self
                .directory
                .list_page(page_size, page_start.as_deref())
                .await?;

            let filtered: Vec<DirectoryUser> = page
                .users
                .into_iter()
                .filter(|u| Self::matches(u, &params))
                .collect();

            // `offset` skips entries already returned from this page by a
            // previous request; it only applies on the first iteration.
            let mut consumed = offset.min(filtered.len());
            offset = 0;

            for user in filtered.iter().skip(consumed) {
                if users.len() == page_size {
                    break;
                }
                users.push(ListedUser::from(user.clone()));
                consumed += 1;
            }

            if users.len() == page_size && consumed < filtered.len() {
                // Page filled with matches left on this upstream page: the
                // next request must resume inside the same page.
                let cursor = PageCursor::Filtered {
                    upstream: page_start,
                    offset: consumed,
                };
                return Ok(ListUsersResponse {
                    count: users.len(),
                    next_page_token: Some(cursor.encode()),
                    users,
                });
            }

            match page.next_page_token {
                Some(token) => upstream_cursor = Some(token),
                None => {
                    // Upstream exhausted.
                    return Ok(ListUsersResponse {
                        count: users.len(),
                        next_page_token: None,
                        users,
                    });
                }
            }

            if users.len() == page_size {
                break;
            }
        }

        // Page filled exactly at an upstream page boundary, or the scan cap
        // was reached with upstream pages remaining.
        let cursor = PageCursor::Filtered {
            upstream: upstream_cursor,
            offset: 0,
        };
        Ok(ListUsersResponse {
            count: users.len(),
            next_page_token: Some(cursor.encode()),
            users,
        })
    }

    fn matches(user: &DirectoryUser, params: &ListUsersParams) -> bool {
        if let Some(needle) = params.email_filter() {
            let email = user.email.as_deref().unwrap_or("").to_lowercase();
            if !email.contains(&needle.to_lowercase()) {
                return false;
            }
        }
        if let Some(want_disabled) = params.disabled {
            if user.disabled != want_disabled {
                return false;
            }
        }
        true
    }

    /// Assign `role` to `uid` by rewriting the user's custom claims.
    ///
    /// The default `User` tier removes the `role` key; all other claim keys
    /// are preserved. This is a read-modify-write with no concurrency guard:
    /// two concurrent updates race at last-writer-wins, which is accepted for
    /// a low-concurrency admin tool.
    pub async fn set_role(&self, uid: &str, role: Role) -> Result<(), AppError> {
        let user = self.directory.get_user(uid).await?;
        let mut claims = user.custom_claims.unwrap_or_default();

        match role.claim_value() {
            Some(value) => {
                claims.insert("role".to_string(), json!(value));
            }
            None => {
                claims.remove("role");
            }
        }

        self.directory.set_custom_claims(uid, claims).await?;
        tracing::info!(uid = %uid, role = ?role, "Role updated");
        Ok(())
    }
}
