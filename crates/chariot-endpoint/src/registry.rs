//! Resource registry.
//!
//! The registry is an append-only table of resources indexed by handle.
//! Handles are dense, start at 0, and are never reused once a resource has
//! been confirmed. Metadata fields are write-once.

use std::fmt;

use chariot_protocol::{Record, ResourceHandle, MAX_ATTR_LEN, MAX_URI_LEN};
use tracing::trace;

use crate::error::{EndpointError, EndpointResult};

// ============================================================================
// Put Handlers
// ============================================================================

/// Handler for remote PUTs on a resource.
///
/// Receives the parameter payload and optionally returns a value to publish
/// back as the resource's new state.
pub trait PutHandler {
    /// Handle one PUT.
    fn on_put(&mut self, params: &str) -> Option<String>;
}

impl<F> PutHandler for F
where
    F: FnMut(&str) -> Option<String>,
{
    fn on_put(&mut self, params: &str) -> Option<String> {
        self(params)
    }
}

// ============================================================================
// Resource
// ============================================================================

/// One registered resource.
pub struct Resource {
    handle: ResourceHandle,
    uri: Option<String>,
    attribute: Option<String>,
    max_frame_len: Option<usize>,
    put_handler: Option<Box<dyn PutHandler>>,
}

impl Resource {
    fn empty(handle: ResourceHandle) -> Self {
        Resource {
            handle,
            uri: None,
            attribute: None,
            max_frame_len: None,
            put_handler: None,
        }
    }

    /// The resource handle.
    pub fn handle(&self) -> ResourceHandle {
        self.handle
    }

    /// Resource path, if set.
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    /// Descriptor, if set.
    pub fn attribute(&self) -> Option<&str> {
        self.attribute.as_deref()
    }

    /// Event buffer length, if set.
    pub fn max_frame_len(&self) -> Option<usize> {
        self.max_frame_len
    }

    /// Whether remote PUTs reach a handler.
    pub fn has_put_handler(&self) -> bool {
        self.put_handler.is_some()
    }

    /// Whether uri, attribute and buffer limit are all present.
    pub fn is_complete(&self) -> bool {
        self.uri.is_some() && self.attribute.is_some() && self.max_frame_len.is_some()
    }

    /// The create record announcing this resource, once it is complete.
    pub fn create_record(&self) -> Option<Record> {
        Some(Record::CreateResource {
            handle: self.handle,
            max_len: self.max_frame_len?,
            uri: self.uri.clone()?,
            attr: self.attribute.clone()?,
        })
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("handle", &self.handle)
            .field("uri", &self.uri)
            .field("attribute", &self.attribute)
            .field("max_frame_len", &self.max_frame_len)
            .field("put_handler", &self.put_handler.is_some())
            .finish()
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Largest capacity a registry can hold; every handle and the next one must
/// fit a `u16`.
pub const MAX_CAPACITY: usize = u16::MAX as usize;

/// Append-only table of resources.
#[derive(Debug)]
pub struct ResourceRegistry {
    resources: Vec<Resource>,
    capacity: usize,
    max_line_len: usize,
}

impl ResourceRegistry {
    /// Create an empty registry.
    ///
    /// Buffer limits must stay strictly below `max_line_len`. Capacity is
    /// clamped to [`MAX_CAPACITY`].
    pub fn new(capacity: usize, max_line_len: usize) -> Self {
        ResourceRegistry {
            resources: Vec::new(),
            capacity: capacity.min(MAX_CAPACITY),
            max_line_len,
        }
    }

    /// Number of allocated handles.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether no handle has been allocated.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// The handle the next allocation will return.
    pub fn next_handle(&self) -> ResourceHandle {
        ResourceHandle(self.resources.len() as u16)
    }

    /// Maximum number of resources.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Transport line length bounding every buffer limit.
    pub fn max_line_len(&self) -> usize {
        self.max_line_len
    }

    /// Reserve the next handle with no metadata attached.
    pub fn allocate(&mut self) -> EndpointResult<ResourceHandle> {
        if self.resources.len() >= self.capacity {
            return Err(EndpointError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        let handle = self.next_handle();
        self.resources.push(Resource::empty(handle));
        trace!("allocated resource {}", handle);
        Ok(handle)
    }

    /// Bind the resource path. Write-once.
    pub fn set_uri(&mut self, handle: ResourceHandle, uri: &str) -> EndpointResult<ResourceHandle> {
        check_text(uri, MAX_URI_LEN, "uri")?;
        let resource = self.slot_mut(handle)?;
        if resource.uri.is_some() {
            return Err(EndpointError::FieldAlreadySet { handle, field: "uri" });
        }
        resource.uri = Some(uri.to_string());
        Ok(handle)
    }

    /// Bind the descriptor. Write-once.
    pub fn set_attribute(
        &mut self,
        handle: ResourceHandle,
        attr: &str,
    ) -> EndpointResult<ResourceHandle> {
        check_text(attr, MAX_ATTR_LEN, "attribute")?;
        let resource = self.slot_mut(handle)?;
        if resource.attribute.is_some() {
            return Err(EndpointError::FieldAlreadySet {
                handle,
                field: "attribute",
            });
        }
        resource.attribute = Some(attr.to_string());
        Ok(handle)
    }

    /// Bind the event buffer length. Write-once; must be in `1..max_line_len`.
    pub fn set_buffer_limit(
        &mut self,
        handle: ResourceHandle,
        len: usize,
    ) -> EndpointResult<ResourceHandle> {
        if len == 0 {
            return Err(EndpointError::InvalidArgument(
                "buffer limit must be at least 1".into(),
            ));
        }
        if len >= self.max_line_len {
            return Err(EndpointError::ValueTooLong {
                max: self.max_line_len.saturating_sub(1),
                actual: len,
            });
        }
        let resource = self.slot_mut(handle)?;
        if resource.max_frame_len.is_some() {
            return Err(EndpointError::FieldAlreadySet {
                handle,
                field: "buffer limit",
            });
        }
        resource.max_frame_len = Some(len);
        Ok(handle)
    }

    /// Bind the PUT handler, replacing any previous one.
    pub fn set_put_handler(
        &mut self,
        handle: ResourceHandle,
        handler: impl PutHandler + 'static,
    ) -> EndpointResult<()> {
        self.slot_mut(handle)?.put_handler = Some(Box::new(handler));
        Ok(())
    }

    /// Look up a resource.
    pub fn get(&self, handle: ResourceHandle) -> Option<&Resource> {
        self.resources.get(handle.index())
    }

    /// Iterate resources in handle order.
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    /// First resource whose uri equals `uri`.
    ///
    /// Duplicate uris are accepted at registration; only the lowest handle is
    /// reachable here.
    pub fn lookup_by_uri(&self, uri: &str) -> Option<ResourceHandle> {
        self.resources
            .iter()
            .find(|r| r.uri.as_deref() == Some(uri))
            .map(|r| r.handle)
    }

    /// Allocate a handle and bind all three fields at once.
    ///
    /// On any failure nothing is left allocated.
    pub(crate) fn reserve(
        &mut self,
        uri: &str,
        max_len: usize,
        attr: &str,
    ) -> EndpointResult<ResourceHandle> {
        let handle = self.allocate()?;
        let bound = self
            .set_uri(handle, uri)
            .and_then(|h| self.set_attribute(h, attr))
            .and_then(|h| self.set_buffer_limit(h, max_len));
        if let Err(e) = bound {
            self.rollback(handle);
            return Err(e);
        }
        Ok(handle)
    }

    /// Drop `handle` if it is the most recent allocation.
    pub(crate) fn rollback(&mut self, handle: ResourceHandle) {
        if handle.index() + 1 == self.resources.len() {
            self.resources.pop();
            trace!("rolled back resource {}", handle);
        }
    }

    /// Run the PUT handler of `handle`, if one is bound.
    pub(crate) fn invoke_put(&mut self, handle: ResourceHandle, params: &str) -> Option<String> {
        self.resources
            .get_mut(handle.index())?
            .put_handler
            .as_mut()?
            .on_put(params)
    }

    /// Forget every resource.
    pub(crate) fn clear(&mut self) {
        self.resources.clear();
    }

    fn slot_mut(&mut self, handle: ResourceHandle) -> EndpointResult<&mut Resource> {
        self.resources
            .get_mut(handle.index())
            .ok_or(EndpointError::InvalidHandle(handle))
    }
}

fn check_text(value: &str, max: usize, what: &str) -> EndpointResult<()> {
    if value.is_empty() {
        return Err(EndpointError::InvalidArgument(format!("{what} is empty")));
    }
    if value.len() > max {
        return Err(EndpointError::ValueTooLong {
            max,
            actual: value.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ResourceRegistry {
        ResourceRegistry::new(4, 64)
    }

    #[test]
    fn test_allocate_until_full() {
        let mut reg = registry();
        for expected in 0..4 {
            assert_eq!(reg.allocate().unwrap(), ResourceHandle(expected));
        }
        assert!(matches!(
            reg.allocate(),
            Err(EndpointError::CapacityExceeded { capacity: 4 })
        ));
        assert_eq!(reg.len(), 4);
    }

    #[test]
    fn test_capacity_is_clamped_to_handle_range() {
        let mut reg = ResourceRegistry::new(usize::MAX, 64);
        assert_eq!(reg.capacity(), MAX_CAPACITY);
        assert!(reg.is_empty());

        let mut reg = ResourceRegistry::new(70_000, 64);
        let mut last = ResourceHandle(0);
        for _ in 0..MAX_CAPACITY {
            last = reg.allocate().unwrap();
        }
        assert_eq!(last, ResourceHandle(u16::MAX - 1));
        assert_eq!(reg.next_handle(), ResourceHandle(u16::MAX));
        assert!(matches!(
            reg.allocate(),
            Err(EndpointError::CapacityExceeded { capacity: MAX_CAPACITY })
        ));
        assert_eq!(reg.len(), MAX_CAPACITY);
    }

    #[test]
    fn test_fields_are_write_once() {
        let mut reg = registry();
        let h = reg.allocate().unwrap();
        reg.set_uri(h, "event/lamp").unwrap();
        let err = reg.set_uri(h, "event/door").unwrap_err();
        assert!(matches!(err, EndpointError::FieldAlreadySet { field: "uri", .. }));
        assert_eq!(reg.get(h).unwrap().uri(), Some("event/lamp"));

        reg.set_attribute(h, "rt=light").unwrap();
        assert!(reg.set_attribute(h, "rt=door").is_err());
        assert_eq!(reg.get(h).unwrap().attribute(), Some("rt=light"));

        reg.set_buffer_limit(h, 20).unwrap();
        assert!(matches!(
            reg.set_buffer_limit(h, 30),
            Err(EndpointError::FieldAlreadySet { .. })
        ));
        assert_eq!(reg.get(h).unwrap().max_frame_len(), Some(20));
    }

    #[test]
    fn test_invalid_handle() {
        let mut reg = registry();
        assert!(matches!(
            reg.set_uri(ResourceHandle(0), "event/lamp"),
            Err(EndpointError::InvalidHandle(ResourceHandle(0)))
        ));
        assert!(reg
            .set_put_handler(ResourceHandle(2), |_: &str| -> Option<String> { None }).is_err());
    }

    #[test]
    fn test_length_bounds() {
        let mut reg = registry();
        let h = reg.allocate().unwrap();
        assert!(matches!(
            reg.set_uri(h, &"u".repeat(MAX_URI_LEN + 1)),
            Err(EndpointError::ValueTooLong { .. })
        ));
        assert!(matches!(
            reg.set_attribute(h, ""),
            Err(EndpointError::InvalidArgument(_))
        ));
        assert!(matches!(
            reg.set_buffer_limit(h, 64),
            Err(EndpointError::ValueTooLong { max: 63, actual: 64 })
        ));
        assert!(matches!(
            reg.set_buffer_limit(h, 0),
            Err(EndpointError::InvalidArgument(_))
        ));
        assert!(reg.set_buffer_limit(h, 63).is_ok());
    }

    #[test]
    fn test_lookup_first_match_wins() {
        let mut reg = registry();
        let a = reg.allocate().unwrap();
        let b = reg.allocate().unwrap();
        reg.set_uri(a, "lamp").unwrap();
        reg.set_uri(b, "lamp").unwrap();
        assert_eq!(reg.lookup_by_uri("lamp"), Some(a));
        assert_eq!(reg.lookup_by_uri("door"), None);
    }

    #[test]
    fn test_reserve_rolls_back_on_bad_field() {
        let mut reg = registry();
        let err = reg.reserve("event/lamp", 64, "rt=light").unwrap_err();
        assert!(matches!(err, EndpointError::ValueTooLong { .. }));
        assert_eq!(reg.next_handle(), ResourceHandle(0));

        let h = reg.reserve("event/lamp", 32, "rt=light").unwrap();
        assert_eq!(h, ResourceHandle(0));
        assert!(reg.get(h).unwrap().is_complete());
    }

    #[test]
    fn test_rollback_only_last() {
        let mut reg = registry();
        let a = reg.allocate().unwrap();
        reg.allocate().unwrap();
        reg.rollback(a);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_put_handler_replaced() {
        let mut reg = registry();
        let h = reg.allocate().unwrap();
        assert!(!reg.get(h).unwrap().has_put_handler());
        assert_eq!(reg.invoke_put(h, "x"), None);

        reg.set_put_handler(h, |p: &str| Some(format!("first {p}"))).unwrap();
        reg.set_put_handler(h, |p: &str| Some(format!("second {p}"))).unwrap();
        assert_eq!(reg.invoke_put(h, "x"), Some("second x".to_string()));
    }

    #[test]
    fn test_create_record_requires_all_fields() {
        let mut reg = registry();
        let h = reg.allocate().unwrap();
        reg.set_uri(h, "event/lamp").unwrap();
        reg.set_attribute(h, "rt=light").unwrap();
        assert!(reg.get(h).unwrap().create_record().is_none());

        reg.set_buffer_limit(h, 32).unwrap();
        let record = reg.get(h).unwrap().create_record().unwrap();
        assert_eq!(
            record.to_line_string(),
            "rsrc=0%maxlen=32%uri=event/lamp%attr=rt=light"
        );
    }
}
