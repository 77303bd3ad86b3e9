//! Module and package name handling
//!
//! Turns free-text names as typed by a user into the slug and package path
//! the copier substitutes for the `MODULE` and `PACKAGE` tokens.

use std::path::MAIN_SEPARATOR_STR;

use thiserror::Error;

use crate::copy::Substitutions;

/// Name validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("Module name is empty")]
    EmptyModule,

    #[error("Package name is empty")]
    EmptyPackage,

    #[error("Module name may not contain '{1}': {0}")]
    InvalidModule(String, char),
}

/// Characters that would break either the directory name or the settings path
const FORBIDDEN_IN_MODULE: &[char] = &['/', '\\', ':', '"'];

/// Lower-case, trim, and replace spaces with hyphens
pub fn normalize_module_name(raw: &str) -> Result<String, NameError> {
    let name = raw.trim().to_lowercase().replace(' ', "-");
    if name.is_empty() {
        return Err(NameError::EmptyModule);
    }
    if let Some(c) = name.chars().find(|c| FORBIDDEN_IN_MODULE.contains(c)) {
        return Err(NameError::InvalidModule(name, c));
    }
    Ok(name)
}

/// Lower-case, strip spaces, and nest under `namespace`
///
/// `("Payment Gateway", ["sk", "o2"])` becomes `sk/o2/paymentgateway`.
pub fn normalize_package_name(raw: &str, namespace: &[String]) -> Result<String, NameError> {
    let leaf = raw.to_lowercase().replace(' ', "");
    if leaf.is_empty() {
        return Err(NameError::EmptyPackage);
    }

    let mut segments: Vec<&str> = namespace
        .iter()
        .map(String::as_str)
        .filter(|s| !s.is_empty())
        .collect();
    segments.push(&leaf);
    Ok(segments.join(MAIN_SEPARATOR_STR))
}

/// Normalized module and package names for one generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    pub module_name: String,
    pub package_name: String,
}

impl ModuleDescriptor {
    pub fn from_input(module: &str, package: &str, namespace: &[String]) -> Result<Self, NameError> {
        Ok(Self {
            module_name: normalize_module_name(module)?,
            package_name: normalize_package_name(package, namespace)?,
        })
    }

    pub fn substitutions(&self) -> Substitutions {
        Substitutions::new(&self.module_name, &self.package_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ns() -> Vec<String> {
        vec!["sk".to_string(), "o2".to_string()]
    }

    #[test]
    fn test_module_name() {
        assert_eq!(normalize_module_name("Payment Gateway").unwrap(), "payment-gateway");
        assert_eq!(normalize_module_name("  Core ").unwrap(), "core");
        assert_eq!(normalize_module_name("   "), Err(NameError::EmptyModule));
        assert_eq!(
            normalize_module_name("a/b"),
            Err(NameError::InvalidModule("a/b".to_string(), '/'))
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_package_name() {
        assert_eq!(
            normalize_package_name("Payment Gateway", &ns()).unwrap(),
            "sk/o2/paymentgateway"
        );
        assert_eq!(normalize_package_name("bar", &[]).unwrap(), "bar");
        assert_eq!(normalize_package_name(" ", &ns()), Err(NameError::EmptyPackage));
    }

    #[cfg(unix)]
    #[test]
    fn test_descriptor_substitutions() {
        let descriptor = ModuleDescriptor::from_input("Foo", "Bar", &ns()).unwrap();
        let subs = descriptor.substitutions();
        assert_eq!(subs.module_name(), "foo");
        assert_eq!(subs.package_name(), "sk/o2/bar");
        assert_eq!(subs.apply("MODULE/src/PACKAGE/Sub"), "foo/src/sk/o2/bar/Sub");
    }
}
