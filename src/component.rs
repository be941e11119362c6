use std::collections::HashMap;

use crate::bus::SharedPin;
use crate::error::{EmuError, Result};

// Component trait
pub trait Component: Send {
    fn name(&self) -> String;
    fn pins(&self) -> HashMap<String, SharedPin>;
    fn get_pin(&self, name: &str) -> Result<SharedPin>;
}

#[derive(Clone)]
pub struct BaseComponent {
    name: String,
    pins: HashMap<String, SharedPin>,
}

impl BaseComponent {
    pub fn new(name: String, pins: HashMap<String, SharedPin>) -> Self {
        BaseComponent { name, pins }
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }
}

impl Component for BaseComponent {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn pins(&self) -> HashMap<String, SharedPin> {
        self.pins.clone()
    }

    fn get_pin(&self, name: &str) -> Result<SharedPin> {
        self.pins
            .get(name)
            .cloned()
            .ok_or_else(|| EmuError::PinNotFound {
                component: self.name.clone(),
                pin: name.to_string(),
            })
    }
}
