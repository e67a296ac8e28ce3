use serde_json::Map;

use crate::error::{Result, TimesheetError, ValidationError};
use crate::ids::{CLIENT_PREFIX, EMPLOYEE_PREFIX, FUNCAO_PREFIX, next_code};
use crate::models::{Client, Employee, EntityStatus, Funcao};
use crate::persistence::Repository;
use crate::storage::RecordStore;

#[derive(Debug, Clone, Default)]
pub struct NewClient {
    pub name: String,
    pub description: Option<String>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
}

/// Changes to an employee's allowed clients/roles and defaults. `None`
/// leaves the current value alone.
#[derive(Debug, Clone, Default)]
pub struct Assignment {
    pub client_ids: Option<Vec<String>>,
    pub funcao_ids: Option<Vec<String>>,
    pub default_client_id: Option<String>,
    pub default_funcao_id: Option<String>,
}

fn ensure_unique<'a>(
    name: &str,
    active: impl IntoIterator<Item = (&'a str, &'a str)>,
    except: Option<&str>,
) -> Result<(), ValidationError> {
    let wanted = name.trim().to_lowercase();
    let clash = active
        .into_iter()
        .filter(|(id, _)| Some(*id) != except)
        .any(|(_, existing)| existing.trim().to_lowercase() == wanted);
    if clash {
        return Err(ValidationError::DuplicateName {
            name: name.trim().to_string(),
        });
    }
    Ok(())
}

fn required_name(name: &str) -> Result<String, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::MissingField { field: "Name" });
    }
    Ok(name.to_string())
}

pub fn add_client<S: RecordStore>(repo: &mut Repository<S>, input: NewClient) -> Result<Client> {
    let name = required_name(&input.name)?;
    let mut clients = repo.clients_for_update()?;
    ensure_unique(
        &name,
        clients
            .iter()
            .filter(|c| c.is_active())
            .map(|c| (c.id.as_str(), c.name.as_str())),
        None,
    )?;

    let client = Client {
        id: next_code(CLIENT_PREFIX, clients.iter().map(|c| c.id.as_str())),
        name,
        description: input.description,
        contact_name: input.contact_name,
        contact_email: input.contact_email,
        status: EntityStatus::Active,
        extra: Map::new(),
    };
    clients.push(client.clone());
    repo.save_clients(&clients)?;
    tracing::info!(client_id = %client.id, "Added client");
    Ok(client)
}

pub fn add_funcao<S: RecordStore>(
    repo: &mut Repository<S>,
    name: &str,
    description: Option<String>,
) -> Result<Funcao> {
    let name = required_name(name)?;
    let mut roles = repo.funcoes_for_update()?;
    ensure_unique(
        &name,
        roles
            .iter()
            .filter(|r| r.is_active())
            .map(|r| (r.id.as_str(), r.name.as_str())),
        None,
    )?;

    let role = Funcao {
        id: next_code(FUNCAO_PREFIX, roles.iter().map(|r| r.id.as_str())),
        name,
        description,
        status: EntityStatus::Active,
        extra: Map::new(),
    };
    roles.push(role.clone());
    repo.save_funcoes(&roles)?;
    tracing::info!(funcao_id = %role.id, "Added role");
    Ok(role)
}

pub fn set_client_status<S: RecordStore>(
    repo: &mut Repository<S>,
    id: &str,
    status: EntityStatus,
) -> Result<Client> {
    let mut clients = repo.clients_for_update()?;
    let index = clients
        .iter()
        .position(|c| c.id == id)
        .ok_or_else(|| TimesheetError::ReferenceNotFound {
            kind: "Client",
            id: id.to_string(),
        })?;
    if status == EntityStatus::Active {
        ensure_unique(
            &clients[index].name,
            clients
                .iter()
                .filter(|c| c.is_active())
                .map(|c| (c.id.as_str(), c.name.as_str())),
            Some(id),
        )?;
    }
    clients[index].status = status;
    repo.save_clients(&clients)?;
    Ok(clients.swap_remove(index))
}

pub fn set_funcao_status<S: RecordStore>(
    repo: &mut Repository<S>,
    id: &str,
    status: EntityStatus,
) -> Result<Funcao> {
    let mut roles = repo.funcoes_for_update()?;
    let index = roles
        .iter()
        .position(|r| r.id == id)
        .ok_or_else(|| TimesheetError::ReferenceNotFound {
            kind: "Role",
            id: id.to_string(),
        })?;
    if status == EntityStatus::Active {
        ensure_unique(
            &roles[index].name,
            roles
                .iter()
                .filter(|r| r.is_active())
                .map(|r| (r.id.as_str(), r.name.as_str())),
            Some(id),
        )?;
    }
    roles[index].status = status;
    repo.save_funcoes(&roles)?;
    Ok(roles.swap_remove(index))
}

pub fn add_employee<S: RecordStore>(repo: &mut Repository<S>, name: &str) -> Result<Employee> {
    let name = required_name(name)?;
    let mut employees = repo.employees_for_update()?;
    let employee = Employee {
        id: next_code(EMPLOYEE_PREFIX, employees.iter().map(|e| e.id.as_str())),
        name,
        assigned_client_ids: Vec::new(),
        assigned_funcao_ids: Vec::new(),
        default_client_id: None,
        default_funcao_id: None,
        time_records: Vec::new(),
        extra: Map::new(),
    };
    employees.push(employee.clone());
    repo.save_employees(&employees)?;
    tracing::info!(employee_id = %employee.id, "Added employee");
    Ok(employee)
}

pub fn assign<S: RecordStore>(
    repo: &mut Repository<S>,
    employee_id: &str,
    assignment: Assignment,
) -> Result<Employee> {
    let clients = repo.clients();
    let roles = repo.funcoes();
    let known_client = |id: &String| clients.iter().any(|c| &c.id == id);
    let known_role = |id: &String| roles.iter().any(|r| &r.id == id);

    let client_ids = assignment.client_ids.iter().flatten();
    let default_client = assignment.default_client_id.iter();
    if let Some(id) = client_ids.chain(default_client).find(|id| !known_client(*id)) {
        return Err(TimesheetError::ReferenceNotFound {
            kind: "Client",
            id: id.clone(),
        });
    }
    let funcao_ids = assignment.funcao_ids.iter().flatten();
    let default_role = assignment.default_funcao_id.iter();
    if let Some(id) = funcao_ids.chain(default_role).find(|id| !known_role(*id)) {
        return Err(TimesheetError::ReferenceNotFound {
            kind: "Role",
            id: id.clone(),
        });
    }

    let mut employees = repo.employees_for_update()?;
    let employee = employees
        .iter_mut()
        .find(|e| e.id == employee_id)
        .ok_or_else(|| TimesheetError::EmployeeNotFound {
            id: employee_id.to_string(),
        })?;

    if let Some(ids) = assignment.client_ids {
        employee.assigned_client_ids = ids;
    }
    if let Some(ids) = assignment.funcao_ids {
        employee.assigned_funcao_ids = ids;
    }
    if assignment.default_client_id.is_some() {
        employee.default_client_id = assignment.default_client_id;
    }
    if assignment.default_funcao_id.is_some() {
        employee.default_funcao_id = assignment.default_funcao_id;
    }

    let updated = employee.clone();
    repo.save_employees(&employees)?;
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn repo() -> Repository<MemoryStore> {
        Repository::new(MemoryStore::new(), "ponto")
    }

    fn client(name: &str) -> NewClient {
        NewClient {
            name: name.to_string(),
            ..NewClient::default()
        }
    }

    #[test]
    fn clients_get_sequential_codes() {
        let mut repo = repo();
        assert_eq!(add_client(&mut repo, client("Acme")).unwrap().id, "CLI001");
        assert_eq!(add_client(&mut repo, client("Globex")).unwrap().id, "CLI002");
        assert_eq!(repo.clients().len(), 2);
    }

    #[test]
    fn active_names_are_unique_ignoring_case() {
        let mut repo = repo();
        add_funcao(&mut repo, "Desenvolvimento", None).unwrap();
        let err = add_funcao(&mut repo, " desenvolvimento ", None).unwrap_err();
        assert!(matches!(
            err,
            TimesheetError::Validation(ValidationError::DuplicateName { .. })
        ));

        set_funcao_status(&mut repo, "FUNC001", EntityStatus::Inactive).unwrap();
        let again = add_funcao(&mut repo, "Desenvolvimento", None).unwrap();
        assert_eq!(again.id, "FUNC002");

        let err = set_funcao_status(&mut repo, "FUNC001", EntityStatus::Active).unwrap_err();
        assert!(matches!(err, TimesheetError::Validation(_)));
    }

    #[test]
    fn blank_names_are_rejected() {
        let mut repo = repo();
        assert!(add_client(&mut repo, client("  ")).is_err());
        assert!(add_employee(&mut repo, "").is_err());
    }

    #[test]
    fn assign_checks_references() {
        let mut repo = repo();
        add_client(&mut repo, client("Acme")).unwrap();
        add_funcao(&mut repo, "Dev", None).unwrap();
        let employee = add_employee(&mut repo, "Ana").unwrap();
        assert_eq!(employee.id, "EMP001");

        let bad = Assignment {
            client_ids: Some(vec!["CLI404".to_string()]),
            ..Assignment::default()
        };
        assert!(matches!(
            assign(&mut repo, "EMP001", bad),
            Err(TimesheetError::ReferenceNotFound { kind: "Client", .. })
        ));

        let good = Assignment {
            client_ids: Some(vec!["CLI001".to_string()]),
            default_client_id: Some("CLI001".to_string()),
            default_funcao_id: Some("FUNC001".to_string()),
            ..Assignment::default()
        };
        let updated = assign(&mut repo, "EMP001", good).unwrap();
        assert_eq!(updated.assigned_client_ids, vec!["CLI001".to_string()]);
        assert_eq!(updated.default_funcao_id.as_deref(), Some("FUNC001"));
        assert!(matches!(
            assign(&mut repo, "EMP404", Assignment::default()),
            Err(TimesheetError::EmployeeNotFound { .. })
        ));
    }
}
