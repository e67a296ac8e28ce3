use crate::catalog::Catalog;
use crate::duration::recompute_total;
use crate::error::{Result, StorageError, TimesheetError};
use crate::models::{Client, Employee, Funcao, StoredRecord, TimeRecord};
use crate::storage::{
    Collection, RecordStore, load_collection, load_collection_or_empty, save_collection,
};

/// Everything a session needs from storage at start-up.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub employee: Employee,
    pub records: Vec<TimeRecord>,
    pub catalog: Catalog,
}

/// Typed access to the employee, client and role collections.
#[derive(Debug)]
pub struct Repository<S: RecordStore> {
    store: S,
    namespace: String,
}

impl<S: RecordStore> Repository<S> {
    pub fn new(store: S, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn key(&self, collection: Collection) -> String {
        collection.key(&self.namespace)
    }

    pub fn employees(&self) -> Vec<Employee> {
        load_collection_or_empty(&self.store, &self.key(Collection::Employees))
    }

    pub fn clients(&self) -> Vec<Client> {
        load_collection_or_empty(&self.store, &self.key(Collection::Clients))
    }

    pub fn funcoes(&self) -> Vec<Funcao> {
        load_collection_or_empty(&self.store, &self.key(Collection::Funcoes))
    }

    /// Strict read used right before a rewrite: a broken collection must not
    /// be replaced by a partial one.
    pub fn employees_for_update(&self) -> Result<Vec<Employee>, StorageError> {
        load_collection(&self.store, &self.key(Collection::Employees))
    }

    pub fn clients_for_update(&self) -> Result<Vec<Client>, StorageError> {
        load_collection(&self.store, &self.key(Collection::Clients))
    }

    pub fn funcoes_for_update(&self) -> Result<Vec<Funcao>, StorageError> {
        load_collection(&self.store, &self.key(Collection::Funcoes))
    }

    pub fn save_employees(&mut self, employees: &[Employee]) -> Result<(), StorageError> {
        let key = self.key(Collection::Employees);
        save_collection(&mut self.store, &key, employees)
    }

    pub fn save_clients(&mut self, clients: &[Client]) -> Result<(), StorageError> {
        let key = self.key(Collection::Clients);
        save_collection(&mut self.store, &key, clients)
    }

    pub fn save_funcoes(&mut self, funcoes: &[Funcao]) -> Result<(), StorageError> {
        let key = self.key(Collection::Funcoes);
        save_collection(&mut self.store, &key, funcoes)
    }

    /// Loads the employee, their records and the clients/roles they may use.
    pub fn open(&self, employee_id: &str, is_admin: bool) -> Result<Loaded> {
        let mut employee = self
            .employees()
            .into_iter()
            .find(|employee| employee.id == employee_id)
            .ok_or_else(|| TimesheetError::EmployeeNotFound {
                id: employee_id.to_string(),
            })?;

        let catalog = Catalog::for_employee(&employee, self.clients(), self.funcoes(), is_admin);
        let records = std::mem::take(&mut employee.time_records)
            .into_iter()
            .map(|row| row.into_record(catalog.roles()))
            .collect();

        Ok(Loaded {
            employee,
            records,
            catalog,
        })
    }

    pub fn load_records(&self, employee_id: &str) -> Result<Vec<TimeRecord>> {
        let roles = self.funcoes();
        self.employees()
            .into_iter()
            .find(|employee| employee.id == employee_id)
            .map(|employee| {
                employee
                    .time_records
                    .into_iter()
                    .map(|row| row.into_record(&roles))
                    .collect()
            })
            .ok_or_else(|| TimesheetError::EmployeeNotFound {
                id: employee_id.to_string(),
            })
    }

    /// Replaces the employee's whole record array. Totals are recomputed from
    /// the clock strings before writing; the committed records are returned.
    pub fn commit(&mut self, employee_id: &str, records: &[TimeRecord]) -> Result<Vec<TimeRecord>> {
        let mut committed = records.to_vec();
        for record in &mut committed {
            recompute_total(record);
        }

        let mut employees = self.employees_for_update()?;
        let employee = employees
            .iter_mut()
            .find(|employee| employee.id == employee_id)
            .ok_or_else(|| TimesheetError::EmployeeNotFound {
                id: employee_id.to_string(),
            })?;
        employee.time_records = committed.iter().map(StoredRecord::from).collect();

        self.save_employees(&employees)?;
        tracing::info!(
            employee_id,
            records = committed.len(),
            "Committed time records"
        );
        Ok(committed)
    }
}
