//! Data source rendering a custom resource as YAML without contacting a cluster

use async_trait::async_trait;
use serde::Serialize;
use std::marker::PhantomData;

use k8sform_core::protocol::{
    MetadataRequest, MetadataResponse, ReadDataSourceRequest, ReadDataSourceResponse,
};
use k8sform_core::{
    Attr, Attribute, DataSourceService, Manifest, ObjectMetadata, ResourceId, Schema,
    StateResponse,
};

use crate::crd::{CustomResourceType, metadata_attribute};
use crate::error::{KubeError, Result};
use crate::resource::{check_spec, validate_document};

/// Configuration and computed outputs of a manifest data source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManifestModel<S> {
    /// `<namespace>/<name>`, computed
    pub id: Attr<String>,
    pub metadata: ObjectMetadata,
    pub spec: S,
    /// Rendered object, computed
    pub yaml: Attr<String>,
}

impl<S: Default> ManifestModel<S> {
    pub fn new(metadata: ObjectMetadata, spec: S) -> Self {
        Self {
            metadata,
            spec,
            ..Default::default()
        }
    }
}

#[derive(Serialize)]
struct ConfigDocument<'a, S> {
    metadata: &'a ObjectMetadata,
    spec: &'a S,
}

/// Schema of the manifest data source for type `C`
pub fn manifest_schema<C: CustomResourceType>() -> Schema {
    Schema::new(format!("{} rendered as a YAML manifest", C::description()))
        .with_attribute(
            "id",
            Attribute::computed_string().with_description("Identifier in the form <namespace>/<name>"),
        )
        .with_attribute("metadata", metadata_attribute())
        .with_attribute("spec", C::spec_attribute())
        .with_attribute(
            "yaml",
            Attribute::computed_string().with_description("The object serialized as YAML"),
        )
}

/// Render the full object, `apiVersion` and `kind` included
pub fn render_yaml<C: CustomResourceType>(metadata: &ObjectMetadata, spec: &C::Spec) -> Result<String> {
    let api_version = C::api_version();
    let manifest = Manifest {
        api_version: &api_version,
        kind: C::KIND,
        metadata,
        spec,
    };
    Ok(serde_yaml::to_string(&manifest)?)
}

/// Manifest data source for custom resource type `C`
pub struct ManifestDataSource<C: CustomResourceType> {
    _type: PhantomData<fn() -> C>,
}

impl<C: CustomResourceType> Default for ManifestDataSource<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: CustomResourceType> ManifestDataSource<C> {
    pub fn new() -> Self {
        Self { _type: PhantomData }
    }

    fn render(&self, mut model: ManifestModel<C::Spec>) -> Result<ManifestModel<C::Spec>> {
        let document = serde_json::to_value(ConfigDocument {
            metadata: &model.metadata,
            spec: &model.spec,
        })
        .map_err(|e| KubeError::Marshal {
            kind: C::KIND.to_string(),
            message: e.to_string(),
        })?;
        validate_document(&manifest_schema::<C>(), &document)?;
        check_spec::<C>(&model.spec)?;

        model.yaml = Attr::Known(render_yaml::<C>(&model.metadata, &model.spec)?);
        model.id = Attr::Known(ResourceId::from_metadata(&model.metadata).to_string());
        Ok(model)
    }
}

#[async_trait]
impl<C: CustomResourceType> DataSourceService for ManifestDataSource<C> {
    type Model = ManifestModel<C::Spec>;

    fn metadata(&self, req: MetadataRequest) -> MetadataResponse {
        MetadataResponse {
            type_name: format!("{}_{}_manifest", req.provider_type_name, C::type_name_suffix()),
        }
    }

    fn schema(&self) -> Schema {
        manifest_schema::<C>()
    }

    async fn read(
        &self,
        req: ReadDataSourceRequest<Self::Model>,
    ) -> ReadDataSourceResponse<Self::Model> {
        match self.render(req.config) {
            Ok(model) => StateResponse::ok(model),
            Err(e) => StateResponse::failed(e),
        }
    }
}
