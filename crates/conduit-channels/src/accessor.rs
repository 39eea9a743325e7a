//! Read/write access to the attributes of a bound cluster

use conduit_core::{AttributeId, AttributeValue, CacheSource};
use tracing::{debug, trace};

use crate::binding::ClusterBinding;
use crate::error::{AccessError, DeliveryError};

/// Attribute reads and writes by name, backed by the binding's cache
#[derive(Debug, Clone)]
pub struct AttributeAccessor {
    binding: ClusterBinding,
}

impl AttributeAccessor {
    pub fn new(binding: ClusterBinding) -> Self {
        Self { binding }
    }

    fn resolve(&self, name: &str) -> Option<AttributeId> {
        self.binding.attributes().id_of(name)
    }

    /// Last known value, without a round trip
    pub fn cached(&self, name: &str) -> Option<AttributeValue> {
        self.resolve(name).and_then(|id| self.binding.cache().get(id))
    }

    /// Read an attribute
    ///
    /// With `prefer_cache` a cached value is returned as is; otherwise, or on a
    /// cache miss, one live read is made and its result cached.
    pub async fn read(&self, name: &str, prefer_cache: bool) -> Result<AttributeValue, AccessError> {
        let id = self.resolve(name).ok_or_else(|| AccessError::UnknownAttribute {
            cluster: self.binding.cluster_name().to_string(),
            attribute: name.to_string(),
        })?;

        if prefer_cache {
            if let Some(value) = self.binding.cache().get(id) {
                trace!(channel = %self.binding.unique_id(), attribute = name, "Cache hit");
                return Ok(value);
            }
        }

        let value = self
            .binding
            .transport()
            .read_attribute(self.binding.endpoint(), self.binding.cluster_id(), id)
            .await
            .map_err(|source| AccessError::Transport {
                attribute: name.to_string(),
                source,
            })?;

        self.binding.cache().insert(id, value.clone(), CacheSource::Read);
        debug!(
            channel = %self.binding.unique_id(),
            attribute = name,
            value = %value,
            "Read attribute"
        );
        Ok(value)
    }

    /// Write attributes in a single request
    ///
    /// The cache only changes once the device has accepted every value.
    pub async fn write(&self, values: &[(&str, AttributeValue)]) -> Result<(), DeliveryError> {
        let mut request = Vec::with_capacity(values.len());
        for (name, value) in values {
            let id = self.resolve(name).ok_or_else(|| DeliveryError::UnknownAttribute {
                cluster: self.binding.cluster_name().to_string(),
                attribute: name.to_string(),
            })?;
            request.push((id, value.clone()));
        }

        self.binding
            .transport()
            .write_attributes(self.binding.endpoint(), self.binding.cluster_id(), &request)
            .await
            .map_err(|source| DeliveryError::Failed {
                attributes: values.iter().map(|(name, _)| name.to_string()).collect(),
                source,
            })?;

        self.binding.cache().insert_many(request, CacheSource::Write);
        debug!(
            channel = %self.binding.unique_id(),
            count = values.len(),
            "Wrote attributes"
        );
        Ok(())
    }
}
