//! Protocol constants
//!
//! Bounds, delimiters and path prefixes shared by the host and the peer
//! device. The peer stores resource metadata in fixed buffers, so the
//! length limits here are part of the wire contract.

// ============================================================================
// Length Bounds
// ============================================================================

/// Maximum resource URI length in bytes.
pub const MAX_URI_LEN: usize = 32;
/// Maximum resource attribute length in bytes.
pub const MAX_ATTR_LEN: usize = 48;
/// Default maximum line length of the serial link. Resource event buffers
/// must stay strictly below this.
pub const DEFAULT_MAX_LINE_LEN: usize = 64;
/// Hard cap for any outbound line (create records, request URLs, console
/// commands), terminator included.
pub const MAX_RECORD_LEN: usize = 160;
/// Maximum accumulated content of a single response frame.
pub const MAX_RESPONSE_LEN: usize = 1024;

// ============================================================================
// Delimiters
// ============================================================================

/// Separator between `key=value` fields of a record.
pub const FIELD_SEPARATOR: char = '%';
/// Terminator appended to every outbound line.
pub const LINE_TERMINATOR: u8 = b'\n';
/// End-of-frame sentinel character.
pub const SENTINEL: u8 = b'<';
/// Number of sentinel characters that close a response frame.
pub const SENTINEL_COUNT: u8 = 2;
/// The full end-of-frame sentinel as it appears in text.
pub const FRAME_SENTINEL: &str = "<<";
/// First byte of a frame answering one of our own requests. The router leaves
/// such data alone for the pending-response logic.
pub const RESPONSE_LEAD_BYTE: u8 = b'c';

// ============================================================================
// Record Keys
// ============================================================================

/// Resource handle key.
pub const KEY_RESOURCE: &str = "rsrc";
/// Event buffer length key.
pub const KEY_MAX_LEN: &str = "maxlen";
/// Resource URI key.
pub const KEY_URI: &str = "uri";
/// Resource attribute key.
pub const KEY_ATTR: &str = "attr";
/// Event value key.
pub const KEY_VALUE: &str = "value";

// ============================================================================
// Inbound Namespaces
// ============================================================================

/// Local pin/board command namespace.
pub const NAMESPACE_PINS: &str = "arduino/";
/// Remote resource PUT namespace.
pub const NAMESPACE_EVENT: &str = "event/";
/// Digital pin sub-prefix.
pub const PREFIX_DIGITAL: &str = "digital/";
/// Analog pin sub-prefix.
pub const PREFIX_ANALOG: &str = "analog/";
/// Pin mode sub-prefix.
pub const PREFIX_MODE: &str = "mode/";
/// Separator between a PUT URI and its parameters.
pub const PARAM_SEPARATOR: char = '&';

// ============================================================================
// Peer Paths
// ============================================================================

/// System command path prefix.
pub const PATH_SYSTEM: &str = "sys/";
/// Sensor query path prefix.
pub const PATH_SENSORS: &str = "sensors/";
/// Resource search path on a remote mote.
pub const PATH_SEARCH: &str = "search";
/// Scheme of outbound request URLs.
pub const COAP_SCHEME: &str = "coap://";

// ============================================================================
// Directory Listing
// ============================================================================

/// Section marker that precedes the mote list.
pub const MOTES_MARKER: &str = "motes:";
/// Local-domain suffix terminating every mote hostname.
pub const MOTE_SUFFIX: &str = ".local";
/// Default bound on the number of motes returned by a listing.
pub const DEFAULT_MAX_MOTES: usize = 8;
