pub mod speech_system;

pub use speech_system::{DeviceStatus, HostPhase, SpeechSystem, SystemInfo};
