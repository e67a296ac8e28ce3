use crate::models::{Client, Employee, Funcao, TimeRecord};

pub const UNKNOWN_LABEL: &str = "unknown";

/// Clients and roles known to a session, plus the subsets the session user
/// may log time against.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    clients: Vec<Client>,
    roles: Vec<Funcao>,
    selectable_clients: Vec<String>,
    selectable_roles: Vec<String>,
}

impl Catalog {
    /// Administrators get every active entry. Employees get their assigned
    /// active entries, or every active entry when nothing is assigned.
    pub fn for_employee(
        employee: &Employee,
        clients: Vec<Client>,
        roles: Vec<Funcao>,
        is_admin: bool,
    ) -> Self {
        let selectable_clients = restrict(
            clients.iter().filter(|c| c.is_active()).map(|c| &c.id),
            &employee.assigned_client_ids,
            is_admin,
        );
        let selectable_roles = restrict(
            roles.iter().filter(|r| r.is_active()).map(|r| &r.id),
            &employee.assigned_funcao_ids,
            is_admin,
        );

        Self {
            clients,
            roles,
            selectable_clients,
            selectable_roles,
        }
    }

    pub fn roles(&self) -> &[Funcao] {
        &self.roles
    }

    pub fn clients(&self) -> &[Client] {
        &self.clients
    }

    pub fn selectable_clients(&self) -> Vec<&Client> {
        self.clients
            .iter()
            .filter(|client| self.selectable_clients.contains(&client.id))
            .collect()
    }

    pub fn selectable_roles(&self) -> Vec<&Funcao> {
        self.roles
            .iter()
            .filter(|role| self.selectable_roles.contains(&role.id))
            .collect()
    }

    pub fn selectable_client(&self, id: &str) -> Option<&Client> {
        if !self.selectable_clients.iter().any(|value| value == id) {
            return None;
        }
        self.clients.iter().find(|client| client.id == id)
    }

    pub fn selectable_role(&self, id: &str) -> Option<&Funcao> {
        if !self.selectable_roles.iter().any(|value| value == id) {
            return None;
        }
        self.roles.iter().find(|role| role.id == id)
    }

    pub fn role(&self, id: &str) -> Option<&Funcao> {
        self.roles.iter().find(|role| role.id == id)
    }

    pub fn is_custom_role(&self, id: &str) -> bool {
        self.role(id).map(Funcao::is_custom_role).unwrap_or(false)
    }

    pub fn client_name(&self, id: Option<&str>) -> String {
        id.and_then(|id| self.clients.iter().find(|client| client.id == id))
            .map(|client| client.name.clone())
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
    }

    /// Role shown for a record: the custom description for "Outra" records,
    /// the role name otherwise.
    pub fn role_label(&self, record: &TimeRecord) -> String {
        if let Some(custom) = record.custom_role() {
            return custom.to_string();
        }
        record
            .funcao_id
            .as_deref()
            .and_then(|id| self.role(id))
            .map(|role| role.name.clone())
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
    }
}

fn restrict<'a>(
    active: impl Iterator<Item = &'a String>,
    assigned: &[String],
    is_admin: bool,
) -> Vec<String> {
    let active: Vec<String> = active.cloned().collect();
    if is_admin || assigned.is_empty() {
        return active;
    }
    active
        .into_iter()
        .filter(|id| assigned.contains(id))
        .collect()
}
