use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinValue {
    Low,
    High,
    HighZ, // Tri-state
}

impl PinValue {
    pub fn to_str(&self) -> &'static str {
        match self {
            PinValue::Low => "Low",
            PinValue::High => "High",
            PinValue::HighZ => "HighZ",
        }
    }

    pub fn to_char(&self) -> char {
        match self {
            PinValue::Low => '0',
            PinValue::High => '1',
            PinValue::HighZ => 'Z',
        }
    }

    pub fn from_bool(value: bool) -> Self {
        if value {
            PinValue::High
        } else {
            PinValue::Low
        }
    }

    /// Logic level as seen by a CMOS input; a floating line reads low
    pub fn is_high(&self) -> bool {
        *self == PinValue::High
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveStrength {
    HighImpedance = 0,
    Weak = 1,
    Standard = 2,
    Strong = 3,
}

impl Ord for DriveStrength {
    fn cmp(&self, other: &Self) -> Ordering {
        (*self as u8).cmp(&(*other as u8))
    }
}

impl PartialOrd for DriveStrength {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One electrical node of the PHROM bus.
///
/// Every device that can drive the node registers under its own driver
/// name. The settled value is resolved from the strongest drivers, with
/// Low dominating High at equal strength (open-collector style).
#[derive(Debug, Clone)]
pub struct Pin {
    name: String,
    drivers: HashMap<String, (PinValue, DriveStrength)>,
    settled_value: PinValue,
}

impl Pin {
    pub fn new(name: String) -> Self {
        Pin {
            name,
            drivers: HashMap::new(),
            settled_value: PinValue::HighZ,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_driver(&mut self, driver_name: &str, value: PinValue) {
        self.set_driver_with_strength(driver_name, value, DriveStrength::Standard);
    }

    /// Driving `HighZ` (or any value at `HighImpedance`) releases the driver
    pub fn set_driver_with_strength(
        &mut self,
        driver_name: &str,
        value: PinValue,
        strength: DriveStrength,
    ) {
        if value == PinValue::HighZ || strength == DriveStrength::HighImpedance {
            self.drivers.remove(driver_name);
        } else {
            self.drivers
                .insert(driver_name.to_string(), (value, strength));
        }

        self.recalculate_value();
    }

    pub fn remove_driver(&mut self, driver_name: &str) {
        self.drivers.remove(driver_name);
        self.recalculate_value();
    }

    pub fn read(&self) -> PinValue {
        self.settled_value
    }

    pub fn get_drivers(&self) -> &HashMap<String, (PinValue, DriveStrength)> {
        &self.drivers
    }

    pub fn is_driven_by(&self, driver_name: &str) -> bool {
        self.drivers.contains_key(driver_name)
    }

    /// True when two drivers of the same (winning) strength disagree
    pub fn is_contended(&self) -> bool {
        let max_strength = match self.drivers.values().map(|(_, s)| *s).max() {
            Some(strength) => strength,
            None => return false,
        };

        let mut saw_high = false;
        let mut saw_low = false;
        for (value, strength) in self.drivers.values() {
            if *strength != max_strength {
                continue;
            }
            match value {
                PinValue::High => saw_high = true,
                PinValue::Low => saw_low = true,
                PinValue::HighZ => {}
            }
        }
        saw_high && saw_low
    }

    fn recalculate_value(&mut self) {
        let max_strength = self
            .drivers
            .values()
            .map(|(_, strength)| *strength)
            .max()
            .unwrap_or(DriveStrength::HighImpedance);

        if max_strength == DriveStrength::HighImpedance {
            self.settled_value = PinValue::HighZ;
            return;
        }

        let strong_drivers: Vec<PinValue> = self
            .drivers
            .values()
            .filter(|(_, strength)| *strength == max_strength)
            .map(|(value, _)| *value)
            .collect();

        // Resolve conflicts: Low dominates, then High
        if strong_drivers.iter().any(|v| *v == PinValue::Low) {
            self.settled_value = PinValue::Low;
        } else if strong_drivers.iter().any(|v| *v == PinValue::High) {
            self.settled_value = PinValue::High;
        } else {
            self.settled_value = PinValue::HighZ;
        }
    }
}

impl Default for Pin {
    fn default() -> Self {
        Pin::new("unnamed".to_string())
    }
}

impl std::fmt::Display for PinValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

impl std::fmt::Display for Pin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.settled_value)?;

        if !self.drivers.is_empty() {
            let mut names: Vec<&String> = self.drivers.keys().collect();
            names.sort();
            write!(f, " [drivers: ")?;
            for (i, driver) in names.into_iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                let (value, strength) = self.drivers[driver];
                write!(f, "{}={}({})", driver, value.to_char(), strength as u8)?;
            }
            write!(f, "]")?;
        }

        Ok(())
    }
}
