//! Method registry - name to handler table

use anyhow::{bail, Result};

/// Every method the gateway can execute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Rexec,
    VideoDevices,
    SetTelemetryPeriod,
    GetConfig,
    SetConfig,
    GetStatus,
    SetThrottle,
    SetSteering,
}

/// One registry entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub name: &'static str,
    pub method: Method,
}

impl MethodDescriptor {
    pub const fn new(name: &'static str, method: Method) -> Self {
        Self { name, method }
    }
}

/// The methods exposed over the relay
pub const STANDARD_METHODS: [MethodDescriptor; 8] = [
    MethodDescriptor::new("rexec", Method::Rexec),
    MethodDescriptor::new("video_devices", Method::VideoDevices),
    MethodDescriptor::new("set_telemetry_period", Method::SetTelemetryPeriod),
    MethodDescriptor::new("get_config", Method::GetConfig),
    MethodDescriptor::new("set_config", Method::SetConfig),
    MethodDescriptor::new("get_status", Method::GetStatus),
    MethodDescriptor::new("set_throttle", Method::SetThrottle),
    MethodDescriptor::new("set_steering", Method::SetSteering),
];

/// Immutable table consulted by the dispatcher. The method count is small,
/// so lookup is a linear scan.
#[derive(Debug, Clone)]
pub struct MethodRegistry {
    methods: Vec<MethodDescriptor>,
}

impl MethodRegistry {
    /// Build a registry, refusing duplicate names
    pub fn new(descriptors: impl IntoIterator<Item = MethodDescriptor>) -> Result<Self> {
        let mut methods: Vec<MethodDescriptor> = Vec::new();
        for descriptor in descriptors {
            if methods.iter().any(|m| m.name == descriptor.name) {
                bail!("method '{}' registered twice", descriptor.name);
            }
            methods.push(descriptor);
        }
        Ok(Self { methods })
    }

    pub fn standard() -> Result<Self> {
        Self::new(STANDARD_METHODS)
    }

    /// Exact-name lookup
    pub fn lookup(&self, name: &str) -> Option<Method> {
        self.methods
            .iter()
            .find(|m| m.name == name)
            .map(|m| m.method)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.methods.iter().map(|m| m.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry() {
        let registry = MethodRegistry::standard().unwrap();
        assert_eq!(registry.names().count(), 8);
        assert_eq!(registry.lookup("get_status"), Some(Method::GetStatus));
        assert_eq!(registry.lookup("set_steering"), Some(Method::SetSteering));
    }

    #[test]
    fn test_lookup_is_exact() {
        let registry = MethodRegistry::standard().unwrap();
        assert_eq!(registry.lookup("GET_STATUS"), None);
        assert_eq!(registry.lookup("get_status "), None);
        assert_eq!(registry.lookup(""), None);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = MethodRegistry::new([
            MethodDescriptor::new("get_status", Method::GetStatus),
            MethodDescriptor::new("get_status", Method::GetConfig),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_names_in_registration_order() {
        let registry = MethodRegistry::standard().unwrap();
        let names: Vec<_> = registry.names().collect();
        assert_eq!(names.first(), Some(&"rexec"));
        assert_eq!(names.last(), Some(&"set_steering"));
    }
}
