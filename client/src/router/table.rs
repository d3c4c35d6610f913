//! Static route table.
//!
//! DESIGN
//! ======
//! Routes are declared as a `const` tree of `RouteNode`s. Flags are
//! `Option<bool>`: a child's value overrides its parent's and an absent value
//! inherits it. `flatten` resolves the tree into `RouteDescriptor`s with
//! joined paths and concrete flags, so guard evaluation never depends on
//! nesting depth.

#[cfg(test)]
#[path = "table_test.rs"]
mod table_test;

pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const HOME_PATH: &str = "/";

// =============================================================================
// DECLARATION
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteMeta {
    pub requires_auth: Option<bool>,
    pub requires_admin: Option<bool>,
    /// Login/register pages: pointless once logged in.
    pub guest: Option<bool>,
}

impl RouteMeta {
    pub const NONE: Self = Self { requires_auth: None, requires_admin: None, guest: None };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteNode {
    /// Absolute (`/login`) or relative to the parent (`admin/users`).
    pub path: &'static str,
    pub name: &'static str,
    pub meta: RouteMeta,
    /// Absolute path this route forwards to.
    pub redirect: Option<&'static str>,
    pub children: &'static [RouteNode],
}

impl RouteNode {
    #[must_use]
    pub const fn new(path: &'static str, name: &'static str) -> Self {
        Self { path, name, meta: RouteMeta::NONE, redirect: None, children: &[] }
    }

    #[must_use]
    pub const fn requires_auth(mut self, value: bool) -> Self {
        self.meta.requires_auth = Some(value);
        self
    }

    #[must_use]
    pub const fn requires_admin(mut self, value: bool) -> Self {
        self.meta.requires_admin = Some(value);
        self
    }

    #[must_use]
    pub const fn guest(mut self) -> Self {
        self.meta.guest = Some(true);
        self
    }

    #[must_use]
    pub const fn redirect(mut self, to: &'static str) -> Self {
        self.redirect = Some(to);
        self
    }

    #[must_use]
    pub const fn children(mut self, children: &'static [RouteNode]) -> Self {
        self.children = children;
        self
    }
}

const LAYOUT_CHILDREN: &[RouteNode] = &[
    RouteNode::new("dashboard", "Dashboard"),
    RouteNode::new("images", "Images"),
    RouteNode::new("upload", "Upload"),
    RouteNode::new("profile", "Profile"),
    RouteNode::new("admin/users", "AdminUsers").requires_admin(true),
    RouteNode::new("admin/images", "AdminImages").requires_admin(true),
];

/// The application's routes.
pub const ROUTES: &[RouteNode] = &[
    RouteNode::new(LOGIN_PATH, "Login").guest(),
    RouteNode::new(REGISTER_PATH, "Register").guest(),
    RouteNode::new(HOME_PATH, "Layout")
        .requires_auth(true)
        .redirect("/dashboard")
        .children(LAYOUT_CHILDREN),
];

// =============================================================================
// RESOLUTION
// =============================================================================

/// A route with its full path and resolved flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescriptor {
    pub path: String,
    pub name: &'static str,
    pub requires_auth: bool,
    pub requires_admin: bool,
    pub guest: bool,
    pub redirect: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Inherited {
    requires_auth: bool,
    requires_admin: bool,
    guest: bool,
}

/// Resolve a route tree into descriptors, parents before children.
#[must_use]
pub fn flatten(nodes: &[RouteNode]) -> Vec<RouteDescriptor> {
    let mut out = Vec::new();
    flatten_into(nodes, "", Inherited::default(), &mut out);
    out
}

fn flatten_into(nodes: &[RouteNode], parent_path: &str, parent: Inherited, out: &mut Vec<RouteDescriptor>) {
    for node in nodes {
        let path = join_route(parent_path, node.path);
        let meta = Inherited {
            requires_auth: node.meta.requires_auth.unwrap_or(parent.requires_auth),
            requires_admin: node.meta.requires_admin.unwrap_or(parent.requires_admin),
            guest: node.meta.guest.unwrap_or(parent.guest),
        };
        out.push(RouteDescriptor {
            path: path.clone(),
            name: node.name,
            requires_auth: meta.requires_auth,
            requires_admin: meta.requires_admin,
            guest: meta.guest,
            redirect: node.redirect.map(normalize_path),
        });
        flatten_into(node.children, &path, meta, out);
    }
}

fn join_route(parent: &str, child: &str) -> String {
    if child.starts_with('/') || parent.is_empty() {
        return normalize_path(child);
    }
    normalize_path(&format!("{}/{child}", parent.trim_end_matches('/')))
}

/// Canonical form of a location: leading `/`, no trailing `/`, no query or
/// fragment.
#[must_use]
pub fn normalize_path(raw: &str) -> String {
    let path = raw.split(['?', '#']).next().unwrap_or_default().trim();
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        HOME_PATH.to_owned()
    } else {
        format!("/{trimmed}")
    }
}

/// Flattened, immutable route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<RouteDescriptor>,
}

impl RouteTable {
    #[must_use]
    pub fn from_nodes(nodes: &[RouteNode]) -> Self {
        Self { routes: flatten(nodes) }
    }

    /// The application's table built from [`ROUTES`].
    #[must_use]
    pub fn standard() -> Self {
        Self::from_nodes(ROUTES)
    }

    #[must_use]
    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<&RouteDescriptor> {
        let path = normalize_path(path);
        self.routes.iter().find(|r| r.path == path)
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::standard()
    }
}
