//! # Lodestone Formats
//!
//! The nine ecosystem wire protocols (spec §4.3): each direct-artifact format
//! (`nuget`, `npm`, `maven`, `go`, `helm`, `cargo`, `rubygems`, `opa`) implements
//! [`lodestone_core::adapter::FormatAdapter`] and is registered in
//! [`build_adapter_registry`]. `oci` is the ninth format but is handled entirely by
//! `lodestone_core::oci_session`/`oci_manifest` instead (its push is a stateful chunked
//! session and its manifests are content-addressed with mutable tags, neither of which
//! fits the `(validate, canonicalize, storage_path)` shape the other eight share) — this
//! crate's `oci` module holds only its response-rendering helpers.
//!
//! Every adapter pairs its parsing (`validate`/`canonicalize`/`storage_path`, called from
//! `lodestone_core::registry::RegistryCoreService::upload`) with the response-rendering
//! functions its ecosystem's read API needs (packument, service index, index.yaml, Cargo
//! index entry, Go info/mod), which `lodestone_http` calls directly by module path since
//! rendering isn't part of the `FormatAdapter` trait (it produces per-ecosystem shapes,
//! not a uniform one).
pub mod cargo;
pub mod errors;
pub mod go;
pub mod helm;
pub mod maven;
pub mod npm;
pub mod nuget;
pub mod oci;
pub mod opa;
pub mod rubygems;
pub mod support;

use lodestone_core::adapter::AdapterRegistry;

/// Registers all eight direct-artifact adapters. Called once at startup by
/// `lodestone_server`.
pub fn build_adapter_registry() -> AdapterRegistry {
    let mut registry = AdapterRegistry::new();
    registry
        .register(Box::new(nuget::NugetAdapter))
        .register(Box::new(npm::NpmAdapter))
        .register(Box::new(maven::MavenAdapter))
        .register(Box::new(go::GoAdapter))
        .register(Box::new(helm::HelmAdapter))
        .register(Box::new(cargo::CargoAdapter))
        .register(Box::new(rubygems::RubygemsAdapter))
        .register(Box::new(opa::OpaAdapter));
    registry
}

#[cfg(test)]
mod test {
    use super::*;
    use lodestone_core::model::Format;

    #[test]
    fn registry_covers_every_direct_artifact_format() {
        let registry = build_adapter_registry();
        for format in Format::ALL {
            if format == Format::Oci {
                continue;
            }
            assert!(registry.get(format).is_ok(), "missing adapter for {format}");
        }
    }
}
