//! # Contract Registry
//!
//! Process-wide arena of compiled objects, indexed by ecosystem-qualified
//! name and by numeric id.
//!
//! - Ids are arena indexes: stable, issued in registration order, never reused.
//! - The built-in system functions are compiled once, before any contract; the
//!   number of objects they produce is the `shift` offset.
//! - Loading compiles outside the write lock and registers each page's output
//!   at once, so readers never observe a half-registered page. Names from every
//!   page are collected first so contracts may reference later pages.
//! - Every contract compiled from one record shares that record's table id.
//! - Externally displayed contract ids are `table_id + DISPLAY_ID_OFFSET`.

use crate::domain::entities::{
    CompiledContract, CompiledUnit, ContractRecord, OwnerInfo, UnitKind,
};
use crate::domain::services::state_name;
use crate::domain::value_objects::address_to_string;
use crate::errors::RegistryError;
use crate::ports::inbound::RegistryLoader;
use crate::ports::outbound::{ContractStore, Interpreter};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Offset between displayed contract ids and table ids.
pub const DISPLAY_ID_OFFSET: i64 = 5000;

/// Default number of contract records fetched per page.
pub const DEFAULT_PAGE_SIZE: usize = 200;

// =============================================================================
// REGISTRY STATE
// =============================================================================

#[derive(Debug, Clone)]
enum RegistryObject {
    Function(String),
    Contract(Arc<CompiledContract>),
}

#[derive(Debug, Default)]
struct RegistryState {
    objects: Vec<RegistryObject>,
    by_name: HashMap<String, usize>,
    by_table: HashMap<i64, Vec<usize>>,
    shift: Option<usize>,
}

impl RegistryState {
    fn contract(&self, index: usize) -> Option<&Arc<CompiledContract>> {
        match self.objects.get(index)? {
            RegistryObject::Contract(contract) => Some(contract),
            RegistryObject::Function(_) => None,
        }
    }

    fn contract_mut(&mut self, index: usize) -> Option<&mut Arc<CompiledContract>> {
        match self.objects.get_mut(index)? {
            RegistryObject::Contract(contract) => Some(contract),
            RegistryObject::Function(_) => None,
        }
    }

    fn contract_names(&self) -> BTreeSet<String> {
        self.objects
            .iter()
            .filter_map(|object| match object {
                RegistryObject::Contract(contract) => Some(contract.name.clone()),
                RegistryObject::Function(_) => None,
            })
            .collect()
    }
}

/// Output of compiling one contract record.
struct StagedRecord {
    owner: OwnerInfo,
    units: Vec<CompiledUnit>,
}

// =============================================================================
// CONTRACT INFO
// =============================================================================

/// Declared field as shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    /// Field name.
    pub name: String,
    /// Declared type.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Whether the field may be omitted.
    pub optional: bool,
}

/// Client-facing projection of a registered contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractInfo {
    /// Displayed id (`table_id + DISPLAY_ID_OFFSET`).
    pub id: i64,
    /// Owning ecosystem.
    pub state: i64,
    /// Activation flag.
    pub active: bool,
    /// Contract record id.
    pub tableid: String,
    /// Wallet id.
    pub walletid: String,
    /// Payment token id.
    pub tokenid: String,
    /// Wallet rendered as an account string.
    pub address: String,
    /// Declared fields.
    pub fields: Vec<FieldInfo>,
    /// Qualified name.
    pub name: String,
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Shared contract registry.
pub struct Registry {
    interpreter: Arc<dyn Interpreter>,
    state: RwLock<RegistryState>,
    load_lock: Mutex<()>,
    page_size: usize,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("Registry")
            .field("objects", &state.objects.len())
            .field("shift", &state.shift)
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(interpreter: Arc<dyn Interpreter>) -> Self {
        Self {
            interpreter,
            state: RwLock::new(RegistryState::default()),
            load_lock: Mutex::new(()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Sets the number of records fetched per page.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Number of objects produced by the system functions, once loaded.
    #[must_use]
    pub fn shift(&self) -> Option<usize> {
        self.state.read().shift
    }

    /// Total number of registered objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().objects.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // -------------------------------------------------------------------------
    // Loading
    // -------------------------------------------------------------------------

    fn ensure_system_functions(&self) -> Result<(), RegistryError> {
        if self.state.read().shift.is_some() {
            return Ok(());
        }
        let units = self
            .interpreter
            .compile(
                self.interpreter.system_functions(),
                &OwnerInfo::default(),
                &BTreeSet::new(),
            )
            .map_err(RegistryError::SystemFunctions)?;

        let mut state = self.state.write();
        for unit in units {
            let index = state.objects.len();
            state.by_name.insert(unit.name.clone(), index);
            state.objects.push(RegistryObject::Function(unit.name));
        }
        let shift = state.objects.len();
        state.shift = Some(shift);
        info!(shift, "system functions loaded");
        Ok(())
    }

    fn loaded_tables(&self) -> HashSet<i64> {
        self.state.read().by_table.keys().copied().collect()
    }

    /// Contract names declared by records not yet loaded, without compiling
    /// them.
    fn pending_names(
        &self,
        records: &[ContractRecord],
        loaded_tables: &HashSet<i64>,
    ) -> Result<BTreeSet<String>, RegistryError> {
        let mut names = BTreeSet::new();
        for record in records.iter().filter(|record| !loaded_tables.contains(&record.id)) {
            let declared = self
                .interpreter
                .contract_names(&record.value, record.ecosystem_id)
                .map_err(|source| RegistryError::Compile {
                    table_id: record.id,
                    names: String::new(),
                    source,
                })?;
            names.extend(declared);
        }
        Ok(names)
    }

    /// Compiles and registers one batch of records. `forward` holds names
    /// that may be referenced before they are registered.
    fn load_records(
        &self,
        records: &[ContractRecord],
        forward: &BTreeSet<String>,
    ) -> Result<usize, RegistryError> {
        let (registered, loaded_tables) = {
            let state = self.state.read();
            let tables: HashSet<i64> = state.by_table.keys().copied().collect();
            (state.contract_names(), tables)
        };

        let mut ignore = registered;
        ignore.extend(forward.iter().cloned());

        let mut staged = Vec::with_capacity(records.len());
        for record in records {
            if loaded_tables.contains(&record.id) {
                debug!(table_id = record.id, "contract already loaded, skipping");
                continue;
            }
            let owner = record.owner();
            let units = self
                .interpreter
                .compile(&record.value, &owner, &ignore)
                .map_err(|source| {
                    let names = self
                        .interpreter
                        .contract_names(&record.value, record.ecosystem_id)
                        .unwrap_or_default()
                        .join(",");
                    warn!(table_id = record.id, %names, error = %source, "contract compile failed");
                    RegistryError::Compile {
                        table_id: record.id,
                        names,
                        source,
                    }
                })?;
            staged.push(StagedRecord { owner, units });
        }

        self.register(staged)
    }

    /// Walks the store page by page.
    fn for_each_page(
        &self,
        store: &dyn ContractStore,
        total: usize,
        mut visit: impl FnMut(&[ContractRecord]) -> Result<(), RegistryError>,
    ) -> Result<(), RegistryError> {
        let mut offset = 0;
        while offset < total {
            let page = store.paged_list(offset, self.page_size)?;
            if page.is_empty() {
                break;
            }
            offset += page.len();
            visit(&page)?;
        }
        Ok(())
    }

    fn register(&self, staged: Vec<StagedRecord>) -> Result<usize, RegistryError> {
        let mut state = self.state.write();

        let mut seen = HashSet::new();
        for record in &staged {
            for unit in &record.units {
                let name = qualified_name(unit, record.owner.ecosystem_id);
                if state.by_name.contains_key(&name) || !seen.insert(name.clone()) {
                    return Err(RegistryError::Duplicate(name));
                }
            }
        }

        let mut count = 0;
        for StagedRecord { owner, units } in staged {
            for unit in units {
                let index = state.objects.len();
                let name = qualified_name(&unit, owner.ecosystem_id);
                state.by_name.insert(name.clone(), index);
                match unit.kind {
                    UnitKind::Function => state.objects.push(RegistryObject::Function(name)),
                    UnitKind::Contract => {
                        state.by_table.entry(owner.table_id).or_default().push(index);
                        debug!(id = index, %name, table_id = owner.table_id, "contract registered");
                        state
                            .objects
                            .push(RegistryObject::Contract(Arc::new(CompiledContract {
                                id: index,
                                name,
                                owner,
                                methods: unit.methods,
                                fields: unit.fields,
                                used: unit.used,
                                program: unit.program,
                            })));
                        count += 1;
                    }
                }
            }
        }
        Ok(count)
    }

    // -------------------------------------------------------------------------
    // Lookup
    // -------------------------------------------------------------------------

    /// Resolves a contract by name within an ecosystem.
    #[must_use]
    pub fn lookup_by_name(&self, name: &str, ecosystem_id: i64) -> Option<Arc<CompiledContract>> {
        let qualified = state_name(ecosystem_id, name);
        let state = self.state.read();
        let index = *state.by_name.get(&qualified)?;
        state.contract(index).cloned()
    }

    /// Resolves a contract by arena id or by displayed id.
    ///
    /// Displayed ids (above `DISPLAY_ID_OFFSET`) are decoded to a table id; the
    /// object found must belong to that table.
    #[must_use]
    pub fn lookup_by_id(&self, id: i64) -> Option<Arc<CompiledContract>> {
        let state = self.state.read();
        if id > DISPLAY_ID_OFFSET {
            let table_id = id - DISPLAY_ID_OFFSET;
            let index = *state.by_table.get(&table_id)?.first()?;
            return state
                .contract(index)
                .filter(|contract| contract.table_id() == table_id)
                .cloned();
        }
        let index = usize::try_from(id).ok()?;
        state.contract(index).cloned()
    }

    /// Contracts referenced from `name`'s call graph.
    ///
    /// With `transitive`, follows references depth-first; every name appears
    /// once and cycles terminate.
    #[must_use]
    pub fn used_contracts(&self, name: &str, ecosystem_id: i64, transitive: bool) -> Vec<String> {
        let Some(root) = self.lookup_by_name(name, ecosystem_id) else {
            return Vec::new();
        };

        let mut listed: HashSet<String> = HashSet::new();
        let mut expanded: HashSet<String> = HashSet::from([root.name.clone()]);
        let mut result = Vec::new();
        let mut stack: Vec<Arc<CompiledContract>> = vec![root];

        while let Some(contract) = stack.pop() {
            // Reverse so that the first edge is expanded first.
            let mut children = Vec::new();
            for used in &contract.used {
                if listed.insert(used.clone()) {
                    result.push(used.clone());
                }
                if transitive && expanded.insert(used.clone()) {
                    if let Some(child) = self.lookup_by_name(used, ecosystem_id) {
                        children.push(child);
                    }
                }
            }
            stack.extend(children.into_iter().rev());
        }
        result
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    fn mutate<T>(
        &self,
        table_id: i64,
        ecosystem_id: i64,
        change: impl Fn(&mut CompiledContract) -> T,
    ) -> Option<T> {
        let mut state = self.state.write();
        let indexes = state.by_table.get(&table_id)?.clone();
        let mut first = None;
        for index in indexes {
            let Some(contract) = state
                .contract_mut(index)
                .filter(|contract| contract.ecosystem_id() == ecosystem_id)
            else {
                continue;
            };
            let previous = change(Arc::make_mut(contract));
            first.get_or_insert(previous);
        }
        first
    }

    /// Sets the active flag of every contract compiled from a record. Returns
    /// the previous value, or `None` when no such contract is registered.
    pub fn set_active(&self, table_id: i64, ecosystem_id: i64, active: bool) -> Option<bool> {
        self.mutate(table_id, ecosystem_id, |contract| {
            std::mem::replace(&mut contract.owner.active, active)
        })
    }

    /// Sets the wallet of every contract compiled from a record. Returns the
    /// previous wallet, or `None` when no such contract is registered.
    pub fn reassign_wallet(&self, table_id: i64, ecosystem_id: i64, wallet_id: i64) -> Option<i64> {
        self.mutate(table_id, ecosystem_id, |contract| {
            std::mem::replace(&mut contract.owner.wallet_id, wallet_id)
        })
    }

    // -------------------------------------------------------------------------
    // Projections
    // -------------------------------------------------------------------------

    /// Client-facing description of a contract.
    #[must_use]
    pub fn contract_info(&self, name: &str, ecosystem_id: i64) -> Option<ContractInfo> {
        let contract = self.lookup_by_name(name, ecosystem_id)?;
        let owner = contract.owner;
        Some(ContractInfo {
            id: owner.table_id + DISPLAY_ID_OFFSET,
            state: owner.ecosystem_id,
            active: owner.active,
            tableid: owner.table_id.to_string(),
            walletid: owner.wallet_id.to_string(),
            tokenid: owner.token_id.to_string(),
            address: address_to_string(owner.wallet_id),
            fields: contract
                .fields
                .iter()
                .map(|field| FieldInfo {
                    name: field.name.clone(),
                    type_name: field.type_name.clone(),
                    optional: field.optional,
                })
                .collect(),
            name: contract.name.clone(),
        })
    }

    /// Qualified names of every registered contract, sorted.
    #[must_use]
    pub fn all_contract_names(&self) -> Vec<String> {
        self.state.read().contract_names().into_iter().collect()
    }

    /// `all_contract_names` as a JSON array.
    #[must_use]
    pub fn all_contracts_json(&self) -> String {
        serde_json::Value::from(self.all_contract_names()).to_string()
    }
}

impl RegistryLoader for Registry {
    fn load_all(&self, store: &dyn ContractStore) -> Result<usize, RegistryError> {
        let _guard = self.load_lock.lock();
        self.ensure_system_functions()?;

        let total = store.count()?;
        let loaded_tables = self.loaded_tables();
        let mut forward = BTreeSet::new();
        self.for_each_page(store, total, |page| {
            forward.extend(self.pending_names(page, &loaded_tables)?);
            Ok(())
        })?;

        let mut records = 0;
        let mut count = 0;
        self.for_each_page(store, total, |page| {
            records += page.len();
            count += self.load_records(page, &forward)?;
            debug!(records, contracts = count, "contract page registered");
            Ok(())
        })?;
        info!(records, contracts = count, "contracts loaded");
        Ok(count)
    }

    fn load_ecosystem(
        &self,
        store: &dyn ContractStore,
        ecosystem_id: i64,
    ) -> Result<usize, RegistryError> {
        let _guard = self.load_lock.lock();
        self.ensure_system_functions()?;

        let records = store.list_by_ecosystem(ecosystem_id)?;
        let forward = self.pending_names(&records, &self.loaded_tables())?;
        let count = self.load_records(&records, &forward)?;
        info!(ecosystem_id, contracts = count, "ecosystem contracts loaded");
        Ok(count)
    }
}

fn qualified_name(unit: &CompiledUnit, ecosystem_id: i64) -> String {
    match unit.kind {
        UnitKind::Contract => state_name(ecosystem_id, &unit.name),
        UnitKind::Function => unit.name.clone(),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_store::InMemoryStorage;
    use crate::adapters::script_vm::ScriptInterpreter;

    fn record(id: i64, ecosystem_id: i64, value: &str) -> ContractRecord {
        ContractRecord {
            id,
            ecosystem_id,
            value: value.to_string(),
            wallet_id: 0,
            token_id: 1,
            active: false,
            conditions: "true".into(),
            app_id: 0,
        }
    }

    fn contract_src(name: &str, calls: &[&str]) -> String {
        let calls: String = calls.iter().map(|c| format!("        call {c}\n")).collect();
        format!("contract {name} {{\n    action {{\n{calls}    }}\n}}\n")
    }

    fn create_registry(records: Vec<ContractRecord>) -> (Registry, InMemoryStorage) {
        let storage = InMemoryStorage::new();
        for record in records {
            storage.put_contract(record);
        }
        let registry = Registry::new(Arc::new(ScriptInterpreter::new())).with_page_size(2);
        (registry, storage)
    }

    #[test]
    fn test_load_all_pages_and_shift() {
        let (registry, storage) = create_registry(vec![
            record(1, 1, &contract_src("A", &[])),
            record(2, 1, &contract_src("B", &["A"])),
            record(3, 2, &contract_src("A", &[])),
        ]);
        assert_eq!(registry.load_all(&storage).unwrap(), 3);
        assert_eq!(registry.shift(), Some(2));
        assert_eq!(registry.len(), 5);
        assert_eq!(registry.all_contract_names(), vec!["@1A", "@1B", "@2A"]);
    }

    #[test]
    fn test_lookup_by_name_then_id() {
        let (registry, storage) = create_registry(vec![record(7, 1, &contract_src("Vote", &[]))]);
        registry.load_all(&storage).unwrap();

        let by_name = registry.lookup_by_name("Vote", 1).unwrap();
        let by_id = registry.lookup_by_id(i64::try_from(by_name.id).unwrap()).unwrap();
        assert_eq!(by_id.name, by_name.name);
        assert!(Arc::ptr_eq(&by_id, &by_name));

        let displayed = registry.lookup_by_id(7 + DISPLAY_ID_OFFSET).unwrap();
        assert_eq!(displayed.name, "@1Vote");
        assert!(registry.lookup_by_id(8 + DISPLAY_ID_OFFSET).is_none());
        assert!(registry.lookup_by_name("Vote", 2).is_none());
    }

    #[test]
    fn test_lookup_by_id_rejects_functions() {
        let (registry, storage) = create_registry(vec![]);
        registry.load_all(&storage).unwrap();
        assert!(registry.lookup_by_id(0).is_none());
        assert!(registry.lookup_by_id(-1).is_none());
    }

    #[test]
    fn test_compile_failure_registers_nothing() {
        let (registry, storage) = create_registry(vec![
            record(1, 1, &contract_src("Good", &[])),
            record(2, 1, "contract Bad {\n    action {\n        explode\n    }\n}\n"),
        ]);
        let err = registry.load_all(&storage).unwrap_err();
        assert!(matches!(err, RegistryError::Compile { table_id: 2, .. }));
        assert!(registry.lookup_by_name("Good", 1).is_none());
        assert!(registry.all_contract_names().is_empty());
    }

    #[test]
    fn test_forward_references_within_a_load() {
        let (registry, storage) = create_registry(vec![
            record(1, 1, &contract_src("First", &["Second"])),
            record(2, 1, &contract_src("Second", &[])),
        ]);
        assert_eq!(registry.load_all(&storage).unwrap(), 2);
    }

    #[test]
    fn test_forward_references_across_pages() {
        let (registry, storage) = create_registry(vec![
            record(1, 1, &contract_src("First", &["Third"])),
            record(2, 1, &contract_src("Second", &[])),
            record(3, 1, &contract_src("Third", &["Second"])),
        ]);
        let registry = registry.with_page_size(1);
        assert_eq!(registry.load_all(&storage).unwrap(), 3);
        assert_eq!(registry.used_contracts("First", 1, true), vec!["@1Third", "@1Second"]);
    }

    #[test]
    fn test_failing_page_keeps_earlier_pages() {
        let (registry, storage) = create_registry(vec![
            record(1, 1, &contract_src("Good", &[])),
            record(2, 1, "contract Bad {\n    action {\n        explode\n    }\n}\n"),
        ]);
        let registry = registry.with_page_size(1);
        let err = registry.load_all(&storage).unwrap_err();
        assert!(matches!(err, RegistryError::Compile { table_id: 2, .. }));
        assert_eq!(registry.all_contract_names(), vec!["@1Good"]);
    }

    #[test]
    fn test_load_ecosystem_and_reload_is_idempotent() {
        let (registry, storage) = create_registry(vec![
            record(1, 1, &contract_src("A", &[])),
            record(2, 2, &contract_src("B", &[])),
        ]);
        assert_eq!(registry.load_ecosystem(&storage, 2).unwrap(), 1);
        assert!(registry.lookup_by_name("B", 2).is_some());
        assert!(registry.lookup_by_name("A", 1).is_none());

        assert_eq!(registry.load_all(&storage).unwrap(), 1);
        assert_eq!(registry.load_all(&storage).unwrap(), 0);
        assert_eq!(registry.shift(), Some(2));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let (registry, storage) = create_registry(vec![
            record(1, 1, &contract_src("A", &[])),
            record(2, 1, &contract_src("A", &[])),
        ]);
        let err = registry.load_all(&storage).unwrap_err();
        assert_eq!(err, RegistryError::Duplicate("@1A".into()));
    }

    #[test]
    fn test_used_contracts_transitive_with_cycle() {
        let (registry, storage) = create_registry(vec![
            record(1, 1, &contract_src("A", &["B", "C"])),
            record(2, 1, &contract_src("B", &["D"])),
            record(3, 1, &contract_src("C", &["A"])),
            record(4, 1, &contract_src("D", &["B"])),
        ]);
        registry.load_all(&storage).unwrap();

        assert_eq!(registry.used_contracts("A", 1, false), vec!["@1B", "@1C"]);
        assert_eq!(
            registry.used_contracts("A", 1, true),
            vec!["@1B", "@1C", "@1D", "@1A"]
        );
        assert!(registry.used_contracts("Missing", 1, true).is_empty());
    }

    #[test]
    fn test_set_active_and_wallet_keep_identity() {
        let (registry, storage) = create_registry(vec![record(4, 1, &contract_src("Pay", &[]))]);
        registry.load_all(&storage).unwrap();
        let before = registry.lookup_by_name("Pay", 1).unwrap();

        assert_eq!(registry.set_active(4, 1, true), Some(false));
        assert_eq!(registry.reassign_wallet(4, 1, 99), Some(0));
        assert_eq!(registry.set_active(4, 2, true), None);
        assert_eq!(registry.set_active(5, 1, true), None);

        let after = registry.lookup_by_name("Pay", 1).unwrap();
        assert_eq!(after.id, before.id);
        assert!(after.owner.active);
        assert_eq!(after.owner.wallet_id, 99);
        assert!(!before.owner.active);
    }

    #[test]
    fn test_set_active_covers_every_contract_of_a_record() {
        let source = format!("{}{}", contract_src("Left", &[]), contract_src("Right", &[]));
        let (registry, storage) = create_registry(vec![
            record(1, 1, &source),
            record(2, 1, &contract_src("Other", &[])),
        ]);
        registry.load_all(&storage).unwrap();

        assert_eq!(registry.set_active(1, 1, true), Some(false));
        assert!(registry.lookup_by_name("Left", 1).unwrap().owner.active);
        assert!(registry.lookup_by_name("Right", 1).unwrap().owner.active);
        assert!(!registry.lookup_by_name("Other", 1).unwrap().owner.active);

        assert_eq!(registry.reassign_wallet(1, 1, 7), Some(0));
        assert_eq!(registry.lookup_by_name("Right", 1).unwrap().owner.wallet_id, 7);

        let displayed = registry.lookup_by_id(1 + DISPLAY_ID_OFFSET).unwrap();
        assert_eq!(displayed.name, "@1Left");
    }

    #[test]
    fn test_contract_info() {
        let source = "contract Send {\n    data {\n        Amount int\n        Memo string optional\n    }\n    action {\n    }\n}\n";
        let mut rec = record(3, 1, source);
        rec.wallet_id = 1234;
        let (registry, storage) = create_registry(vec![rec]);
        registry.load_all(&storage).unwrap();

        let info = registry.contract_info("Send", 1).unwrap();
        assert_eq!(info.id, 5003);
        assert_eq!(info.tableid, "3");
        assert_eq!(info.address, "0000-0000-0000-0000-1234");
        assert_eq!(info.fields.len(), 2);
        assert!(info.fields[1].optional);

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["fields"][0]["type"], "int");
        assert_eq!(json["name"], "@1Send");
    }

    #[test]
    fn test_all_contracts_json() {
        let (registry, storage) = create_registry(vec![
            record(1, 1, &contract_src("Zeta", &[])),
            record(2, 1, &contract_src("Alpha", &[])),
        ]);
        registry.load_all(&storage).unwrap();
        assert_eq!(registry.all_contracts_json(), r#"["@1Alpha","@1Zeta"]"#);
    }
}
