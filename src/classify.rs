//! Assigns semantic roles to unified column labels by keyword matching.
use crate::table::normalize_label;
use log::debug;
use std::fmt::Display;

/// Semantic role a column can play in the financial summary
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Revenue,
    Cost,
    Quantity,
    Product,
    Date,
    Client,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Role::Revenue => "REVENUE",
            Role::Cost => "COST",
            Role::Quantity => "QUANTITY",
            Role::Product => "PRODUCT",
            Role::Date => "DATE",
            Role::Client => "CLIENT",
        };
        write!(f, "{name}")
    }
}

/// Keywords per role, matched as substrings of the normalized label
const ROLE_KEYWORDS: &[(Role, &[&str])] = &[
    (Role::Revenue, &["INGRESO", "VENTA"]),
    (Role::Cost, &["COSTO"]),
    (Role::Quantity, &["CANTIDAD", "QTY"]),
    (Role::Product, &["PRODUCTO"]),
    (Role::Date, &["FECHA"]),
    (Role::Client, &["CLIENTE"]),
];

/// The column label resolved for each role, if any
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColumnRoleMap {
    roles: Vec<(Role, String)>,
}

impl ColumnRoleMap {
    pub fn get(&self, role: Role) -> Option<&str> {
        self.roles
            .iter()
            .find(|(candidate, _)| *candidate == role)
            .map(|(_, label)| label.as_str())
    }

    pub fn has(&self, role: Role) -> bool {
        self.get(role).is_some()
    }

    /// Resolved roles with their labels, in role order
    pub fn iter(&self) -> impl Iterator<Item = (Role, &str)> {
        self.roles.iter().map(|(role, label)| (*role, label.as_str()))
    }
}

/// For each role, picks the first column whose label contains one of the
/// role's keywords. Roles without a match are left out.
pub fn classify(columns: &[String]) -> ColumnRoleMap {
    let roles = ROLE_KEYWORDS
        .iter()
        .filter_map(|(role, keywords)| {
            let label = columns.iter().find(|column| {
                let normalized = normalize_label(column);
                keywords.iter().any(|keyword| normalized.contains(keyword))
            });
            match label {
                Some(label) => {
                    debug!("Column '{}' resolved as {}", label, role);
                    Some((*role, label.to_owned()))
                }
                None => {
                    debug!("No column resolved as {}", role);
                    None
                }
            }
        })
        .collect();
    ColumnRoleMap { roles }
}
