//! A mounted feature namespace
//!
//! [`FeatureFs`] is one running service instance: it owns the config list
//! behind the interface lock, the node tree, and a handle on the feature
//! registry. Every namespace operation (mkdir, rmdir, read, write, list)
//! goes through it.
//!
//! Tree layout:
//!
//! ```text
//! /available_features
//! /set_features
//! /activate
//! /configs/<name>/{available_features,set_features,activate,<feature>/<param>}
//! /<feature>/<param>
//! ```

use std::sync::Arc;

use featfs_utils::{FeatfsError, Result};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::activation;
use crate::model::{ActivationState, Config, ConfigId, ConfigList, ParamRef};
use crate::namespace::{feed_tokens, Binding, Node, NodeAllocator, NodeKind, NsPath, Tree};
use crate::registry::{
    parse_bool, validate_node_name, FeatureRegistry, ParamKey, SELECTION_FILE,
};
use crate::settings::{BootSettings, InternalParamDirs, NamespaceSettings, Settings};

#[cfg(test)]
mod tests;

/// Name of the config created with the namespace
pub const ROOT_CONFIG: &str = "root";

const CONFIGS_DIR: &str = "configs";
const ACTIVATE_FILE: &str = "activate";
const AVAILABLE_FILE: &str = "available_features";

/// How a write treats the values already in a parameter file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Drop existing values first
    #[default]
    Replace,
    /// Keep existing values and add after them
    Append,
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirEntry {
    pub name: String,
    pub kind: NodeKind,
    pub writable: bool,
}

/// Point-in-time view of a config, for display
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSnapshot {
    pub name: String,
    pub path: String,
    pub state: ActivationState,
    pub held: Vec<String>,
    pub entries: Vec<EntrySnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntrySnapshot {
    pub param: String,
    pub values: Vec<String>,
}

/// Service instance exposing the feature namespace
pub struct FeatureFs {
    registry: Arc<FeatureRegistry>,
    settings: NamespaceSettings,
    /// Interface lock; always taken before `tree`
    configs: Mutex<ConfigList>,
    tree: RwLock<Tree>,
}

impl FeatureFs {
    /// Build the namespace and the root config, then activate boot features
    pub fn mount(registry: Arc<FeatureRegistry>, settings: &Settings) -> Result<Self> {
        let fs = Self {
            registry,
            settings: settings.namespace.clone(),
            configs: Mutex::new(ConfigList::new()),
            tree: RwLock::new(Tree::new(settings.namespace.max_nodes)),
        };

        fs.create_root_config()?;
        info!(
            "Mounted namespace with {} features ({} nodes)",
            fs.registry.len(),
            fs.tree.read().node_count()
        );

        fs.boot(&settings.boot)?;
        Ok(fs)
    }

    pub fn registry(&self) -> &Arc<FeatureRegistry> {
        &self.registry
    }

    // ==================== Config lifecycle ====================

    fn create_root_config(&self) -> Result<ConfigId> {
        let mut configs = self.configs.lock();
        let mut tree = self.tree.write();

        let mut config = Config::new(ROOT_CONFIG, NsPath::root().to_string());
        let mut alloc = tree.allocator();
        let nodes = self.build_config_nodes(&mut alloc, &mut config, true)?;
        tree.attach(&NsPath::root(), nodes)?;

        configs.insert(config).inspect_err(|_| {
            tree.clear();
        })
    }

    /// Create `configs/<name>` and its config
    ///
    /// Nothing is attached and nothing is registered unless every node of the
    /// subtree could be built.
    pub fn create_config(&self, name: &str) -> Result<ConfigId> {
        validate_node_name(name)?;
        let path = configs_dir().join(name);

        let mut configs = self.configs.lock();
        if configs.contains_name(name) {
            return Err(FeatfsError::AlreadyExists(path.to_string()));
        }

        let mut tree = self.tree.write();
        let mut config = Config::new(name, path.to_string());
        let mut alloc = tree.allocator();

        let built = self
            .build_config_dir(&mut alloc, &mut config)
            .and_then(|dir| tree.attach(&configs_dir(), vec![dir]));
        if let Err(e) = built {
            error!("Failed to create config {}: {}", name, e);
            return Err(e);
        }

        let entries = config.entries().len();
        let id = match configs.insert(config) {
            Ok(id) => id,
            Err(e) => {
                let _ = tree.detach(&path);
                return Err(e);
            }
        };

        info!("Created config {} ({} entries)", name, entries);
        Ok(id)
    }

    /// Remove `configs/<name>` and destroy its config
    ///
    /// The subtree is detached before the config leaves the list. A config
    /// missing from the list is logged and the removal still succeeds.
    pub fn remove_config(&self, name: &str) -> Result<()> {
        let path = configs_dir().join(name);

        let mut configs = self.configs.lock();
        let detached = self.tree.write().detach(&path)?;
        debug!("Detached {} nodes at {}", detached.count(), path);
        drop(detached);

        match configs.find_id(name) {
            Some(id) => self.destroy_config(&mut configs, id),
            None => error!("Failed to find config: {}", name),
        }
        Ok(())
    }

    fn destroy_config(&self, configs: &mut ConfigList, id: ConfigId) {
        if let Err(e) = activation::request_transition(&self.registry, configs, id, false) {
            warn!("Config deactivated with errors before removal: {}", e);
        }
        if let Some(config) = configs.remove(id) {
            info!(
                "Removed config {} ({} entries dropped)",
                config.name(),
                config.entries().len()
            );
        }
    }

    /// Tear down the namespace and every config, root included
    ///
    /// Active configs are deactivated; failures are logged. Safe to call
    /// more than once.
    pub fn unmount(&self) {
        let mut configs = self.configs.lock();
        let detached = self.tree.write().clear();
        if detached.is_empty() && configs.is_empty() {
            return;
        }
        drop(detached);

        for id in configs.ids().into_iter().rev() {
            self.destroy_config(&mut configs, id);
        }
        info!("Namespace unmounted");
    }

    fn boot(&self, boot: &BootSettings) -> Result<()> {
        if boot.features.is_empty() {
            return Ok(());
        }

        let selection = boot.features.join(",");
        let selection_file = NsPath::root().join(SELECTION_FILE).to_string();
        let activate_file = NsPath::root().join(ACTIVATE_FILE).to_string();
        let result = self
            .write(&selection_file, selection.as_bytes(), WriteMode::Replace)
            .and_then(|_| self.write(&activate_file, b"1", WriteMode::Replace));

        match result {
            Ok(_) => {
                info!("Boot features enabled: {}", selection);
                Ok(())
            }
            Err(e) if boot.strict => {
                error!("Boot features could not be enabled: {}", e);
                Err(e)
            }
            Err(e) => {
                warn!("Some boot features could not be enabled: {}", e);
                Ok(())
            }
        }
    }

    fn build_config_dir(&self, alloc: &mut NodeAllocator, config: &mut Config) -> Result<Node> {
        let mut dir = alloc.dir(config.name(), Binding::ConfigRoot(config.id()))?;
        for node in self.build_config_nodes(alloc, config, false)? {
            dir.push_child(node);
        }
        Ok(dir)
    }

    /// Control files and parameter directories of one config, creating its
    /// entries along the way
    fn build_config_nodes(
        &self,
        alloc: &mut NodeAllocator,
        config: &mut Config,
        with_configs_dir: bool,
    ) -> Result<Vec<Node>> {
        let id = config.id();
        let mut nodes = Vec::new();

        let selection = config.add_entry(ParamRef::Selection);
        nodes.push(alloc.file(
            SELECTION_FILE,
            true,
            Binding::Param {
                config: id,
                entry: selection,
            },
        )?);
        nodes.push(alloc.file(AVAILABLE_FILE, false, Binding::AvailableFeatures)?);
        nodes.push(alloc.file(ACTIVATE_FILE, true, Binding::Activate(id))?);
        if with_configs_dir {
            nodes.push(alloc.dir(CONFIGS_DIR, Binding::ConfigsDir)?);
        }

        for (index, feature) in self.registry.indexed() {
            if !feature.has_params() {
                continue;
            }
            let writable = match (feature.is_internal(), self.settings.internal_param_dirs) {
                (true, InternalParamDirs::Hide) => continue,
                (true, InternalParamDirs::ReadOnly) => false,
                _ => true,
            };

            let mut dir = alloc.dir(
                feature.name(),
                Binding::FeatureDir {
                    config: id,
                    feature: index,
                },
            )?;
            for (param_index, param) in feature.params().iter().enumerate() {
                let entry = config.add_entry(ParamRef::Declared(ParamKey {
                    feature: index,
                    param: param_index,
                }));
                let binding = Binding::Param { config: id, entry };
                dir.push_child(alloc.file(param.name(), writable, binding)?);
            }
            nodes.push(dir);
        }

        Ok(nodes)
    }

    // ==================== Namespace operations ====================

    /// Create a directory; only allowed directly under `configs/`
    pub fn mkdir(&self, path: &str) -> Result<()> {
        let path = NsPath::parse(path)?;
        let (parent, name) = path
            .split_last()
            .ok_or_else(|| FeatfsError::AlreadyExists(path.to_string()))?;

        match self.resolve(&parent)? {
            (Binding::ConfigsDir, _, _) => self.create_config(name).map(|_| ()),
            (_, NodeKind::Dir, _) => Err(FeatfsError::PermissionDenied(path.to_string())),
            (_, NodeKind::File, _) => Err(FeatfsError::NotADirectory(parent.to_string())),
        }
    }

    /// Remove a config directory under `configs/`
    pub fn rmdir(&self, path: &str) -> Result<()> {
        let path = NsPath::parse(path)?;
        match (self.resolve(&path)?, path.name()) {
            ((Binding::ConfigRoot(_), _, _), Some(name)) => self.remove_config(name),
            ((_, NodeKind::File, _), _) => Err(FeatfsError::NotADirectory(path.to_string())),
            _ => Err(FeatfsError::PermissionDenied(path.to_string())),
        }
    }

    /// List a directory
    pub fn list(&self, path: &str) -> Result<Vec<DirEntry>> {
        let path = NsPath::parse(path)?;
        let tree = self.tree.read();
        let node = tree
            .lookup(&path)
            .ok_or_else(|| FeatfsError::NotFound(path.to_string()))?;
        if !node.is_dir() {
            return Err(FeatfsError::NotADirectory(path.to_string()));
        }
        Ok(node
            .children()
            .iter()
            .map(|c| DirEntry {
                name: c.name().to_string(),
                kind: c.kind(),
                writable: c.is_writable(),
            })
            .collect())
    }

    /// Read a file's content
    pub fn read(&self, path: &str) -> Result<String> {
        let path = NsPath::parse(path)?;
        let (binding, kind, _) = self.resolve(&path)?;
        if kind == NodeKind::Dir {
            return Err(FeatfsError::IsADirectory(path.to_string()));
        }
        self.read_bound(&path, binding)
    }

    /// Read through a binding resolved earlier; its config may be gone
    fn read_bound(&self, path: &NsPath, binding: Binding) -> Result<String> {
        match binding {
            Binding::AvailableFeatures => Ok(self.available_features()),
            Binding::Activate(id) => {
                let configs = self.configs.lock();
                let config = configs.get(id).ok_or_else(|| stale(path))?;
                Ok(format!("{}\n", u8::from(config.is_activated())))
            }
            Binding::Param { config, entry } => {
                let configs = self.configs.lock();
                let entry = configs
                    .get(config)
                    .and_then(|c| c.entry(entry))
                    .ok_or_else(|| stale(path))?;
                let param = entry
                    .param()
                    .resolve(&self.registry)
                    .ok_or_else(|| FeatfsError::internal(format!("{} has no parameter", path)))?;

                let mut out = String::new();
                for value in entry.values() {
                    out.push_str(&param.codec().stringify(value));
                    out.push('\n');
                }
                Ok(out)
            }
            _ => Err(FeatfsError::internal(format!("{} is not bound to a file", path))),
        }
    }

    /// Write to a file, returning the number of bytes consumed
    pub fn write(&self, path: &str, data: &[u8], mode: WriteMode) -> Result<usize> {
        let path = NsPath::parse(path)?;
        let (binding, kind, writable) = self.resolve(&path)?;
        if kind == NodeKind::Dir {
            return Err(FeatfsError::IsADirectory(path.to_string()));
        }
        if !writable {
            return Err(FeatfsError::PermissionDenied(path.to_string()));
        }
        self.write_bound(&path, binding, data, mode)
    }

    /// Write through a binding resolved earlier; its config may be gone
    fn write_bound(
        &self,
        path: &NsPath,
        binding: Binding,
        data: &[u8],
        mode: WriteMode,
    ) -> Result<usize> {
        match binding {
            Binding::Activate(id) => {
                let want = std::str::from_utf8(data)
                    .ok()
                    .and_then(parse_bool)
                    .ok_or_else(|| {
                        FeatfsError::invalid_input(format!(
                            "expected a boolean, got {:?}",
                            String::from_utf8_lossy(data).trim()
                        ))
                    })?;

                let mut configs = self.configs.lock();
                if configs.get(id).is_none() {
                    return Err(stale(path));
                }
                activation::request_transition(&self.registry, &mut configs, id, want)?;
                Ok(data.len())
            }
            Binding::Param { config, entry } => {
                self.write_param(path, config, entry, data, mode)
            }
            _ => Err(FeatfsError::PermissionDenied(path.to_string())),
        }
    }

    fn write_param(
        &self,
        path: &NsPath,
        config: ConfigId,
        entry: usize,
        data: &[u8],
        mode: WriteMode,
    ) -> Result<usize> {
        let mut configs = self.configs.lock();
        let config = configs.get_mut(config).ok_or_else(|| stale(path))?;

        if config.state() != ActivationState::Inactive {
            error!("Config {} must be deactivated before any update", config.name());
            return Err(FeatfsError::Busy(config.name().to_string()));
        }

        let param = config
            .entry(entry)
            .and_then(|e| e.param().resolve(&self.registry))
            .ok_or_else(|| stale(path))?;
        let values = config.values_mut(entry)?;
        if mode == WriteMode::Replace {
            values.drain();
        }

        feed_tokens(data, self.settings.chunk_size, |token| {
            let value = param.codec().parse(token).map_err(|reason| FeatfsError::Parse {
                param: param.name().to_string(),
                token: token.to_string(),
                reason,
            })?;
            values.push(value);
            Ok(())
        })
    }

    /// Content of `available_features`; needs no lock
    pub fn available_features(&self) -> String {
        self.registry
            .available_names()
            .map(|name| format!("{}\n", name))
            .collect()
    }

    // ==================== Introspection ====================

    /// Activate or deactivate a config by name
    pub fn set_active(&self, name: &str, want_active: bool) -> Result<()> {
        let mut configs = self.configs.lock();
        let id = configs
            .find_id(name)
            .ok_or_else(|| FeatfsError::NotFound(format!("config {}", name)))?;
        activation::request_transition(&self.registry, &mut configs, id, want_active)
    }

    pub fn config_count(&self) -> usize {
        self.configs.lock().len()
    }

    pub fn config_names(&self) -> Vec<String> {
        self.configs
            .lock()
            .list()
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.tree.read().node_count()
    }

    /// Snapshot of every config, oldest first
    pub fn snapshot(&self) -> Vec<ConfigSnapshot> {
        let configs = self.configs.lock();
        configs
            .list()
            .into_iter()
            .map(|config| ConfigSnapshot {
                name: config.name().to_string(),
                path: config.root().to_string(),
                state: config.state(),
                held: config.held().to_vec(),
                entries: config
                    .entries()
                    .iter()
                    .filter_map(|entry| {
                        let param = entry.param().resolve(&self.registry)?;
                        let label = match entry.param() {
                            ParamRef::Selection => param.name().to_string(),
                            ParamRef::Declared(key) => format!(
                                "{}/{}",
                                self.registry.feature_at(key.feature)?.name(),
                                param.name()
                            ),
                        };
                        Some(EntrySnapshot {
                            param: label,
                            values: entry
                                .values()
                                .iter()
                                .map(|v| param.codec().stringify(v))
                                .collect(),
                        })
                    })
                    .collect(),
            })
            .collect()
    }

    /// Binding, kind and writability of the node at `path`
    fn resolve(&self, path: &NsPath) -> Result<(Binding, NodeKind, bool)> {
        let tree = self.tree.read();
        tree.lookup(path)
            .map(|node| (node.binding(), node.kind(), node.is_writable()))
            .ok_or_else(|| FeatfsError::NotFound(path.to_string()))
    }
}

impl Drop for FeatureFs {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn configs_dir() -> NsPath {
    NsPath::root().join(CONFIGS_DIR)
}

/// The node was resolved but its config went away before the lock was taken
fn stale(path: &NsPath) -> FeatfsError {
    FeatfsError::NotFound(path.to_string())
}
