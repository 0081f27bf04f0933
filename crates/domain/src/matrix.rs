//! The resource×action grid editor used to assign permissions to a role.
//!
//! The matrix is an immutable-per-revision value: every transition consumes
//! the current revision and returns the next one, so the host layer owns
//! mutation and the engine only computes transitions and validation.
//!
//! A cell is available only if the catalog defines a permission for that
//! exact `(resource, action)` pair. Unavailable cells are excluded from
//! every bulk operation.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{Action, Permission, PermissionId};

/// Aggregate check state of one action column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnState {
    /// Every available cell in the column is selected.
    Checked,
    /// No available cell in the column is selected.
    Unchecked,
    /// Some, but not all, available cells are selected.
    Indeterminate,
}

/// One selected action with the catalog permission id backing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedAction {
    /// Catalog permission id for the `(resource, action)` pair.
    pub id: PermissionId,
    /// Selected action.
    pub action: Action,
}

/// Selected actions for one resource, as handed to role updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSelection {
    /// Resource name.
    pub resource: String,
    /// Selected `(id, action)` pairs; never empty.
    pub actions: Vec<SelectedAction>,
}

/// Validation outcome for a matrix revision.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatrixValidation {
    /// Per-resource errors: the resource has available actions but none
    /// selected. Empty when the global error is set.
    pub resource_errors: BTreeMap<String, String>,
    /// Raised when the entire matrix has zero selections.
    pub global_error: Option<String>,
}

impl MatrixValidation {
    /// Returns whether the revision may be persisted.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.resource_errors.is_empty() && self.global_error.is_none()
    }
}

/// A sparse resource×action selection grid over the permission catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionMatrix {
    resources: BTreeSet<String>,
    actions: Vec<Action>,
    available: BTreeMap<(String, Action), PermissionId>,
    selected: BTreeSet<(String, Action)>,
}

impl PermissionMatrix {
    /// Builds an empty matrix from the permission catalog.
    ///
    /// Rows are the distinct resources; columns are the five standard
    /// actions plus any custom actions the catalog defines, customs sorted
    /// after the standards.
    #[must_use]
    pub fn from_catalog(catalog: &[Permission]) -> Self {
        let mut resources = BTreeSet::new();
        let mut custom_actions = BTreeSet::new();
        let mut available = BTreeMap::new();

        for permission in catalog {
            resources.insert(permission.resource.clone());
            if !permission.action.is_standard() {
                custom_actions.insert(permission.action.clone());
            }
            available.insert(
                (permission.resource.clone(), permission.action.clone()),
                permission.id,
            );
        }

        let mut actions: Vec<Action> = Action::STANDARD.to_vec();
        actions.extend(custom_actions);

        Self {
            resources,
            actions,
            available,
            selected: BTreeSet::new(),
        }
    }

    /// Loads a role's current assignment into the matrix.
    ///
    /// Pairs that are no longer available in the catalog are dropped.
    #[must_use]
    pub fn with_selected(mut self, assigned: &[Permission]) -> Self {
        for permission in assigned {
            let key = (permission.resource.clone(), permission.action.clone());
            if self.available.contains_key(&key) {
                self.selected.insert(key);
            }
        }
        self
    }

    /// Sets or clears one cell. Unavailable cells are a no-op.
    #[must_use]
    pub fn toggle_cell(mut self, resource: &str, action: &Action, checked: bool) -> Self {
        let key = (resource.trim().to_lowercase(), action.clone());
        if !self.available.contains_key(&key) {
            return self;
        }

        if checked {
            self.selected.insert(key);
        } else {
            self.selected.remove(&key);
        }
        self
    }

    /// Toggles a whole row: clears it when every available action is
    /// selected, otherwise selects every available action.
    #[must_use]
    pub fn toggle_row(mut self, resource: &str) -> Self {
        let resource = resource.trim().to_lowercase();
        let row: Vec<(String, Action)> = self
            .available
            .keys()
            .filter(|(candidate, _)| candidate == &resource)
            .cloned()
            .collect();

        if row.is_empty() {
            return self;
        }

        if row.iter().all(|key| self.selected.contains(key)) {
            for key in row {
                self.selected.remove(&key);
            }
        } else {
            for key in row {
                self.selected.insert(key);
            }
        }
        self
    }

    /// Toggles a whole column across every resource where the action is
    /// available, with the same all-or-nothing rule as [`Self::toggle_row`].
    #[must_use]
    pub fn toggle_column(mut self, action: &Action) -> Self {
        let column: Vec<(String, Action)> = self
            .available
            .keys()
            .filter(|(_, candidate)| candidate == action)
            .cloned()
            .collect();

        if column.is_empty() {
            return self;
        }

        if column.iter().all(|key| self.selected.contains(key)) {
            for key in column {
                self.selected.remove(&key);
            }
        } else {
            for key in column {
                self.selected.insert(key);
            }
        }
        self
    }

    /// Returns the tri-state rendering hint for a column header.
    ///
    /// A column with no available cells reports `Unchecked`.
    #[must_use]
    pub fn column_state(&self, action: &Action) -> ColumnState {
        let mut available = 0usize;
        let mut selected = 0usize;
        for key in self.available.keys() {
            if &key.1 == action {
                available += 1;
                if self.selected.contains(key) {
                    selected += 1;
                }
            }
        }

        if available == 0 || selected == 0 {
            ColumnState::Unchecked
        } else if selected == available {
            ColumnState::Checked
        } else {
            ColumnState::Indeterminate
        }
    }

    /// Resets every selection. Used when a create-mode access preset
    /// changes; always an explicit host call, never an implicit side
    /// effect of another transition.
    #[must_use]
    pub fn cleared(mut self) -> Self {
        self.selected.clear();
        self
    }

    /// Returns whether the catalog defines the pair.
    #[must_use]
    pub fn is_available(&self, resource: &str, action: &Action) -> bool {
        self.available
            .contains_key(&(resource.trim().to_lowercase(), action.clone()))
    }

    /// Returns whether the pair is currently selected.
    #[must_use]
    pub fn is_selected(&self, resource: &str, action: &Action) -> bool {
        self.selected
            .contains(&(resource.trim().to_lowercase(), action.clone()))
    }

    /// Returns the row resources in display order.
    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.resources.iter().map(String::as_str)
    }

    /// Returns the column actions in display order.
    #[must_use]
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Returns the total number of selected cells.
    #[must_use]
    pub fn selection_count(&self) -> usize {
        self.selected.len()
    }

    /// Validates the revision before persistence.
    ///
    /// A resource is in error when it has at least one available action and
    /// none selected. A matrix with zero selections overall reports only
    /// the single global error.
    #[must_use]
    pub fn validate(&self) -> MatrixValidation {
        if self.available.is_empty() {
            return MatrixValidation::default();
        }

        if self.selected.is_empty() {
            return MatrixValidation {
                resource_errors: BTreeMap::new(),
                global_error: Some("select at least one permission".to_owned()),
            };
        }

        let mut resource_errors = BTreeMap::new();
        for resource in &self.resources {
            let has_available = self
                .available
                .keys()
                .any(|(candidate, _)| candidate == resource);
            let has_selected = self
                .selected
                .iter()
                .any(|(candidate, _)| candidate == resource);
            if has_available && !has_selected {
                resource_errors.insert(
                    resource.clone(),
                    format!("select at least one action for '{resource}'"),
                );
            }
        }

        MatrixValidation {
            resource_errors,
            global_error: None,
        }
    }

    /// Emits the persistence payload: only resources with a selection,
    /// each with only its selected `(id, action)` pairs.
    #[must_use]
    pub fn to_persistence_payload(&self) -> Vec<ResourceSelection> {
        let mut grouped: BTreeMap<String, Vec<SelectedAction>> = BTreeMap::new();

        for key in &self.selected {
            let Some(id) = self.available.get(key) else {
                continue;
            };
            grouped
                .entry(key.0.clone())
                .or_default()
                .push(SelectedAction {
                    id: *id,
                    action: key.1.clone(),
                });
        }

        grouped
            .into_iter()
            .map(|(resource, actions)| ResourceSelection { resource, actions })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{ColumnState, PermissionMatrix};
    use crate::{Action, Permission, PermissionId};

    fn entry(resource: &str, action: Action) -> Permission {
        Permission::new(PermissionId::new(), resource, action, "", "")
            .unwrap_or_else(|_| unreachable!())
    }

    fn catalog() -> Vec<Permission> {
        vec![
            entry("document", Action::Create),
            entry("document", Action::Read),
            entry("document", Action::Update),
            entry("document", Action::Delete),
            entry("reports", Action::Read),
            entry("reports", Action::Manage),
            entry("reports", Action::Custom("export".to_owned())),
        ]
    }

    #[test]
    fn columns_are_standard_actions_plus_catalog_customs() {
        let matrix = PermissionMatrix::from_catalog(&catalog());
        let actions = matrix.actions();
        assert_eq!(actions.len(), 6);
        assert_eq!(actions[4], Action::Manage);
        assert_eq!(actions[5], Action::Custom("export".to_owned()));
    }

    #[test]
    fn toggling_an_unavailable_cell_is_a_no_op() {
        let matrix = PermissionMatrix::from_catalog(&catalog());
        let next = matrix.toggle_cell("document", &Action::Manage, true);
        assert_eq!(next.selection_count(), 0);
    }

    #[test]
    fn toggle_cell_sets_and_clears() {
        let matrix = PermissionMatrix::from_catalog(&catalog())
            .toggle_cell("document", &Action::Read, true);
        assert!(matrix.is_selected("document", &Action::Read));

        let matrix = matrix.toggle_cell("document", &Action::Read, false);
        assert!(!matrix.is_selected("document", &Action::Read));
    }

    #[test]
    fn toggle_row_checks_all_available_then_clears() {
        let matrix = PermissionMatrix::from_catalog(&catalog()).toggle_row("document");
        assert_eq!(matrix.selection_count(), 4);
        assert!(!matrix.is_selected("document", &Action::Manage));

        let matrix = matrix.toggle_row("document");
        assert_eq!(matrix.selection_count(), 0);
    }

    #[test]
    fn partially_checked_row_fills_up_before_clearing() {
        let matrix = PermissionMatrix::from_catalog(&catalog())
            .toggle_cell("document", &Action::Read, true)
            .toggle_row("document");
        assert_eq!(matrix.selection_count(), 4);
    }

    #[test]
    fn toggle_row_on_a_manage_only_resource_selects_manage() {
        let only_manage = vec![entry("reports", Action::Manage)];
        let matrix = PermissionMatrix::from_catalog(&only_manage).toggle_row("reports");
        assert!(matrix.is_selected("reports", &Action::Manage));
        assert_eq!(matrix.selection_count(), 1);
    }

    #[test]
    fn toggle_column_never_touches_unavailable_cells() {
        let matrix = PermissionMatrix::from_catalog(&catalog()).toggle_column(&Action::Read);
        assert!(matrix.is_selected("document", &Action::Read));
        assert!(matrix.is_selected("reports", &Action::Read));
        assert_eq!(matrix.selection_count(), 2);

        let matrix = matrix.toggle_column(&Action::Read);
        assert_eq!(matrix.selection_count(), 0);
    }

    #[test]
    fn column_state_reports_tri_state() {
        let matrix = PermissionMatrix::from_catalog(&catalog());
        assert_eq!(matrix.column_state(&Action::Read), ColumnState::Unchecked);

        let matrix = matrix.toggle_cell("document", &Action::Read, true);
        assert_eq!(
            matrix.column_state(&Action::Read),
            ColumnState::Indeterminate
        );

        let matrix = matrix.toggle_cell("reports", &Action::Read, true);
        assert_eq!(matrix.column_state(&Action::Read), ColumnState::Checked);
    }

    #[test]
    fn zero_selections_raise_only_the_global_error() {
        let validation = PermissionMatrix::from_catalog(&catalog()).validate();
        assert!(validation.global_error.is_some());
        assert!(validation.resource_errors.is_empty());
        assert!(!validation.is_valid());
    }

    #[test]
    fn resource_with_nothing_selected_is_in_error() {
        let validation = PermissionMatrix::from_catalog(&catalog())
            .toggle_cell("document", &Action::Read, true)
            .validate();
        assert!(validation.global_error.is_none());
        assert!(validation.resource_errors.contains_key("reports"));
        assert!(!validation.is_valid());
    }

    #[test]
    fn fully_selected_rows_validate() {
        let validation = PermissionMatrix::from_catalog(&catalog())
            .toggle_row("document")
            .toggle_row("reports")
            .validate();
        assert!(validation.is_valid());
    }

    #[test]
    fn empty_catalog_validates_trivially() {
        let validation = PermissionMatrix::from_catalog(&[]).validate();
        assert!(validation.is_valid());
    }

    #[test]
    fn payload_contains_only_selected_pairs() {
        let payload = PermissionMatrix::from_catalog(&catalog())
            .toggle_cell("document", &Action::Read, true)
            .toggle_cell("reports", &Action::Manage, true)
            .to_persistence_payload();

        assert_eq!(payload.len(), 2);
        assert_eq!(payload[0].resource, "document");
        assert_eq!(payload[0].actions.len(), 1);
        assert_eq!(payload[1].resource, "reports");
        assert_eq!(payload[1].actions[0].action, Action::Manage);
    }

    #[test]
    fn payload_carries_the_catalog_permission_id() {
        let catalog = vec![entry("reports", Action::Manage)];
        let expected = catalog[0].id;
        let payload = PermissionMatrix::from_catalog(&catalog)
            .toggle_row("reports")
            .to_persistence_payload();
        assert_eq!(payload[0].actions[0].id, expected);
    }

    #[test]
    fn with_selected_drops_unavailable_pairs() {
        let stale = vec![entry("archive", Action::Read)];
        let matrix = PermissionMatrix::from_catalog(&catalog()).with_selected(&stale);
        assert_eq!(matrix.selection_count(), 0);
    }

    #[test]
    fn with_selected_roundtrips_the_payload() {
        let catalog = catalog();
        let matrix = PermissionMatrix::from_catalog(&catalog)
            .toggle_row("document")
            .toggle_cell("reports", &Action::Manage, true);
        let payload = matrix.to_persistence_payload();

        let assigned: Vec<_> = catalog
            .iter()
            .filter(|permission| {
                payload.iter().any(|selection| {
                    selection
                        .actions
                        .iter()
                        .any(|selected| selected.id == permission.id)
                })
            })
            .cloned()
            .collect();

        let reloaded = PermissionMatrix::from_catalog(&catalog).with_selected(&assigned);
        assert_eq!(reloaded, matrix);
    }

    #[test]
    fn cleared_resets_every_selection() {
        let matrix = PermissionMatrix::from_catalog(&catalog())
            .toggle_row("document")
            .cleared();
        assert_eq!(matrix.selection_count(), 0);
    }
}
