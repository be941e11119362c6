//! # JSON Configuration System
//!
//! Builds a [`SpeechSystem`] from a JSON description of the PHROMs sharing
//! one speech bus.
//!
//! ## Usage
//!
//! ```no_run
//! use tms6100_emu::system_config::SystemFactory;
//!
//! let factory = SystemFactory::new();
//! let mut configured = factory.create_from_json("configs/speech_demo.json").expect("Could not create system!");
//!
//! let info = configured.system().get_system_info();
//! println!("Created system: {} with {} PHROMs", info.name, info.device_count);
//! let bytes = configured.system_mut().read_at(0x0000, 4);
//! ```
//!
//! ## Configuration File Format
//!
//! ```json
//! {
//!   "name": "Acorn Speech System",
//!   "description": "Two PHROMs sharing the TMS5220 bus",
//!   "components": {
//!     "PHROM_A": {
//!       "single": {
//!         "component_type": "tms6100",
//!         "name": "PHROM_A",
//!         "properties": {"bank": 0, "image": "acorn.bin"}
//!       }
//!     },
//!     "SPARES": {
//!       "array": {
//!         "component_type": "tms6100",
//!         "count": 2,
//!         "naming_pattern": "PHROM_{:02}",
//!         "properties": {"bank": 2, "fill": 0}
//!       }
//!     }
//!   },
//!   "console": {"refresh_rate_ms": 100, "dump_width": 16}
//! }
//! ```
//!
//! `image` paths are resolved against the directory holding the config file.
//! Array entries take consecutive banks starting at `bank`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::components::memory::bank_rom::{BankDataProvider, BankRom};
use crate::console::ConsoleConfig;
use crate::error::{EmuError, Result};
use crate::systems::speech_system::{SpeechSystem, SystemInfo};
use crate::types::{BankId, NOT_MY_BANK};

pub type Properties = HashMap<String, serde_json::Value>;

/// JSON-based system configuration structures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    pub components: HashMap<String, ComponentConfig>,
    #[serde(default)]
    pub console: Option<ConsoleConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ComponentConfig {
    #[serde(rename = "single")]
    Single(SingleComponentConfig),
    #[serde(rename = "array")]
    Array(ArrayComponentConfig),
}

impl ComponentConfig {
    pub fn component_type(&self) -> &str {
        match self {
            ComponentConfig::Single(single) => &single.component_type,
            ComponentConfig::Array(array) => &array.component_type,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleComponentConfig {
    pub component_type: String,
    pub name: String,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrayComponentConfig {
    pub component_type: String,
    pub count: usize,
    pub naming_pattern: String,
    #[serde(default)]
    pub properties: Properties,
    /// Per-instance properties keyed by the expanded name
    pub overrides: Option<HashMap<String, Properties>>,
}

/// Everything a creator needs to build one component instance
#[derive(Debug, Clone)]
pub struct ComponentRequest<'a> {
    pub name: String,
    /// Position within an array entry, 0 for single components
    pub index: usize,
    pub properties: Properties,
    pub base_dir: &'a Path,
}

pub type ComponentCreator = fn(&ComponentRequest<'_>) -> Result<BankRom>;

/// System factory for creating systems from JSON configuration
#[derive(Debug)]
pub struct SystemFactory {
    component_registry: HashMap<String, ComponentCreator>,
}

impl SystemFactory {
    pub fn new() -> Self {
        let mut factory = SystemFactory {
            component_registry: HashMap::new(),
        };
        factory.register_default_components();
        factory
    }

    fn register_default_components(&mut self) {
        self.register("tms6100", create_tms6100);
    }

    pub fn register(&mut self, component_type: &str, creator: ComponentCreator) {
        self.component_registry
            .insert(component_type.to_string(), creator);
    }

    pub fn create_from_json(&self, json_path: impl AsRef<Path>) -> Result<ConfigurableSystem> {
        let path = json_path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| EmuError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        log::info!("Loading system configuration from {}", path.display());
        self.create_from_str(&content, base_dir)
    }

    pub fn create_from_str(&self, json: &str, base_dir: &Path) -> Result<ConfigurableSystem> {
        let config: SystemConfig = serde_json::from_str(json)?;
        let system = self.build_system(&config, base_dir)?;
        Ok(ConfigurableSystem::new(config, system))
    }

    fn build_system(&self, config: &SystemConfig, base_dir: &Path) -> Result<SpeechSystem> {
        let mut roms = Vec::new();

        let mut ids: Vec<&String> = config.components.keys().collect();
        ids.sort();
        for id in ids {
            let component_config = &config.components[id];
            let creator = self
                .component_registry
                .get(component_config.component_type())
                .ok_or_else(|| {
                    log::warn!(
                        "Component {} has unknown type '{}'",
                        id,
                        component_config.component_type()
                    );
                    EmuError::UnknownComponentType(component_config.component_type().to_string())
                })?;

            for request in self.expand_requests(component_config, base_dir) {
                let rom = creator(&request)?;
                roms.push((request.name, rom));
            }
        }

        // Present devices in bank order regardless of how the JSON map iterates
        roms.sort_by_key(|(_, rom)| rom.bank_id());

        let mut system = SpeechSystem::new(config.name.clone(), config.description.clone());
        for (name, rom) in roms {
            if let Err(e) = system.add_device(name, rom) {
                log::warn!("Rejected configuration: {}", e);
                return Err(e);
            }
        }
        system.reset();
        Ok(system)
    }

    fn expand_requests<'a>(
        &self,
        config: &ComponentConfig,
        base_dir: &'a Path,
    ) -> Vec<ComponentRequest<'a>> {
        match config {
            ComponentConfig::Single(single) => vec![ComponentRequest {
                name: single.name.clone(),
                index: 0,
                properties: single.properties.clone(),
                base_dir,
            }],
            ComponentConfig::Array(array) => (0..array.count)
                .map(|i| {
                    let name = array.naming_pattern.replace("{:02}", &format!("{:02}", i));
                    let mut properties = array.properties.clone();
                    if let Some(overrides) = array.overrides.as_ref().and_then(|o| o.get(&name)) {
                        properties.extend(overrides.clone());
                    }
                    ComponentRequest {
                        name,
                        index: i,
                        properties,
                        base_dir,
                    }
                })
                .collect(),
        }
    }
}

impl Default for SystemFactory {
    fn default() -> Self {
        SystemFactory::new()
    }
}

fn invalid(name: &str, property: &str, reason: impl Into<String>) -> EmuError {
    let err = EmuError::InvalidProperty {
        name: name.to_string(),
        property: property.to_string(),
        reason: reason.into(),
    };
    log::warn!("Rejected configuration: {}", err);
    err
}

fn create_tms6100(request: &ComponentRequest<'_>) -> Result<BankRom> {
    let name = request.name.as_str();

    let first_bank = request
        .properties
        .get("bank")
        .ok_or_else(|| invalid(name, "bank", "missing"))?
        .as_u64()
        .ok_or_else(|| invalid(name, "bank", "expected a non-negative integer"))?;
    let bank_value = first_bank + request.index as u64;
    let bank = u8::try_from(bank_value)
        .ok()
        .and_then(BankId::new)
        .ok_or_else(|| {
            log::warn!("{} asks for bank {}", name, bank_value);
            EmuError::InvalidBank {
                name: name.to_string(),
                bank: bank_value,
            }
        })?;

    let fill = match request.properties.get("fill") {
        None => NOT_MY_BANK,
        Some(value) => value
            .as_u64()
            .and_then(|v| u8::try_from(v).ok())
            .ok_or_else(|| invalid(name, "fill", "expected a byte value 0-255"))?,
    };

    match request.properties.get("image") {
        None => Ok(BankRom::new(bank, fill)),
        Some(value) => {
            let image = value
                .as_str()
                .ok_or_else(|| invalid(name, "image", "expected a file path"))?;
            let path: PathBuf = request.base_dir.join(image);
            BankRom::from_file(name, bank, &path, fill)
        }
    }
}

/// A speech system created from JSON configuration
pub struct ConfigurableSystem {
    config: SystemConfig,
    system: SpeechSystem,
}

impl ConfigurableSystem {
    pub fn new(config: SystemConfig, system: SpeechSystem) -> Self {
        ConfigurableSystem { config, system }
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn system(&self) -> &SpeechSystem {
        &self.system
    }

    pub fn system_mut(&mut self) -> &mut SpeechSystem {
        &mut self.system
    }

    pub fn console_config(&self) -> ConsoleConfig {
        self.config.console.clone().unwrap_or_default()
    }

    pub fn get_system_info(&self) -> SystemInfo {
        self.system.get_system_info()
    }

    pub fn into_system(self) -> SpeechSystem {
        self.system
    }
}
