//! OCI image/index builders, grounded directly on
//! `legacy/oci-distribution-test/src/lib.rs`'s `Layer`/`Image`/`Index` builders — adapted
//! from `portfolio_core::OciDigest` onto [`lodestone_core::digest::OciDigest`] and from
//! `RepositoryStoreManager`-flavored helpers onto plain byte/manifest construction that
//! `lodestone_http` test suites push through `OciManifestService` directly.
use bytes::Bytes;
use derive_builder::Builder;
use oci_spec::image::{
    Descriptor, DescriptorBuilder, History, ImageConfiguration, ImageConfigurationBuilder,
    ImageIndex, ImageIndexBuilder, ImageManifest, ImageManifestBuilder, MediaType,
};

use lodestone_core::digest::OciDigest;

use crate::errors::{Error, Result};

#[derive(Builder, Clone)]
#[builder(build_fn(skip))]
pub struct Layer {
    pub data: Bytes,
    pub history: Option<History>,

    #[builder(setter(skip))]
    pub descriptor: Descriptor,
}

impl LayerBuilder {
    pub fn build(self) -> Result<Layer> {
        let data = self
            .data
            .ok_or_else(|| Error::LayerBuilderError("must include data to construct Layer".to_string()))?;
        let digest = OciDigest::from_bytes(&data);
        let descriptor = DescriptorBuilder::default()
            .media_type(MediaType::ImageLayer)
            .digest(digest.to_string())
            .size(data.len() as i64)
            .build()
            .expect("must set all required fields for descriptor");
        Ok(Layer {
            data,
            descriptor,
            history: self.history.flatten(),
        })
    }
}

#[derive(Builder, Clone)]
#[builder(build_fn(skip))]
pub struct Image {
    pub config: ImageConfiguration,
    pub layers: Vec<Layer>,

    #[builder(setter(skip))]
    pub manifest: ImageManifest,
    #[builder(setter(skip))]
    pub config_bytes: Bytes,
}

fn default_config() -> ImageConfiguration {
    ImageConfigurationBuilder::default()
        .os("linux")
        .architecture("amd64")
        .build()
        .expect("minimal image configuration is always valid")
}

impl ImageBuilder {
    pub fn build(self) -> Result<Image> {
        let config = self.config.unwrap_or_else(default_config);
        let config_bytes = Bytes::from(serde_json::to_vec(&config)?);
        let config_digest = OciDigest::from_bytes(&config_bytes);
        let config_descriptor = DescriptorBuilder::default()
            .media_type(MediaType::ImageConfig)
            .digest(config_digest.to_string())
            .size(config_bytes.len() as i64)
            .build()
            .expect("must set all required fields for descriptor");

        let layers = self.layers.unwrap_or_default();
        let layer_descriptors: Vec<Descriptor> = layers.iter().map(|l| l.descriptor.clone()).collect();

        let manifest = ImageManifestBuilder::default()
            .schema_version(2u32)
            .media_type(MediaType::ImageManifest)
            .layers(layer_descriptors)
            .config(config_descriptor)
            .build()
            .expect("must set all required fields for image manifest");

        Ok(Image {
            config,
            manifest,
            layers,
            config_bytes,
        })
    }
}

impl Image {
    pub fn manifest_bytes(&self) -> Bytes {
        Bytes::from(serde_json::to_vec(&self.manifest).expect("manifest always serializes"))
    }

    pub fn digest(&self) -> OciDigest {
        OciDigest::from_bytes(&self.manifest_bytes())
    }
}

#[derive(Builder)]
#[builder(build_fn(skip))]
pub struct Index {
    pub manifests: Vec<Image>,

    #[builder(setter(skip))]
    pub index_manifest: ImageIndex,
}

impl IndexBuilder {
    pub fn build(self) -> Result<Index> {
        let manifests = self.manifests.unwrap_or_default();
        let manifest_descriptors: Vec<Descriptor> = manifests
            .iter()
            .map(|m| {
                DescriptorBuilder::default()
                    .media_type(MediaType::ImageManifest)
                    .digest(m.digest().to_string())
                    .size(m.manifest_bytes().len() as i64)
                    .build()
                    .expect("must set all required fields for descriptor")
            })
            .collect();

        let index_manifest = ImageIndexBuilder::default()
            .schema_version(2u32)
            .media_type(MediaType::ImageIndex)
            .manifests(manifest_descriptors)
            .build()
            .expect("must set all required fields for image index");

        Ok(Index {
            manifests,
            index_manifest,
        })
    }
}

impl Index {
    pub fn index_bytes(&self) -> Bytes {
        Bytes::from(serde_json::to_vec(&self.index_manifest).expect("index always serializes"))
    }
}

/// A single-layer image with deterministic, small test data. Covers the common case most
/// manifest/tag tests only need one of.
pub fn basic_image() -> Image {
    let layer = LayerBuilder::default()
        .data(Bytes::from_static(b"layer contents"))
        .build()
        .expect("basic layer always builds");
    ImageBuilder::default()
        .layers(vec![layer])
        .build()
        .expect("basic image always builds")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn basic_image_has_one_layer_descriptor() {
        let image = basic_image();
        assert_eq!(image.manifest.layers().len(), 1);
    }

    #[test]
    fn index_references_manifest_digests() {
        let index = IndexBuilder::default()
            .manifests(vec![basic_image(), basic_image()])
            .build()
            .unwrap();
        assert_eq!(index.index_manifest.manifests().len(), 2);
    }
}
