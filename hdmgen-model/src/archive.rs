//! Binary save and restore of object graphs.
//!
//! # Format
//! ```text
//! header      ArchiveHeader (magic, version, flags)
//! symbols     u32 count, then count length-prefixed strings (ids 1..=count)
//! roots       u32 count, then count references
//! counts      per concrete entity in tag order: u32 tag, u32 count
//! objects     per tag, per object:
//!               u32 id, ref parent, u32 file symbol,
//!               u32 start line, u16 start column, u32 end line, u16 end column,
//!               u32 child count, child references,
//!               one value per effective member, base-first
//! ```
//! References are `(tag, index)` pairs with one-based per-type indices; zero
//! encodes null. Collections carry a presence flag before their length.
//! Only objects reachable from the roots through references, parent links
//! and adopted children are written, numbered densely in `(tag, index)`
//! order, so saving a restored graph reproduces the archive byte for byte.

use crate::error::{ModelError, Result};
use crate::graph::Graph;
use crate::value::Value;
use bytes::Bytes;
use hdmgen_core::{ArchiveHeader, ObjRef, ObjectHeader, SymbolId, SymbolTable, WireReader, WireWriter};
use hdmgen_schema::{Member, PolicyTable, ResolutionContext, ScalarKind};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Smallest encoded symbol: its length prefix.
const STR_MIN_LENGTH: usize = 4;

/// Smallest encoded object: a header with no children and no members.
const HEADER_MIN_LENGTH: usize = 4 + WireReader::REF_LENGTH + 4 + 4 + 2 + 4 + 2 + 4;

/// Objects reachable from `roots`, in `(tag, index)` order.
///
/// # Errors
/// Returns `ModelError::DanglingReference` if a reference names a missing object.
pub fn reachable(graph: &Graph, roots: &[ObjRef]) -> Result<BTreeSet<ObjRef>> {
    let mut seen = BTreeSet::new();
    let mut pending = roots.to_vec();
    while let Some(obj) = pending.pop() {
        if !seen.insert(obj) {
            continue;
        }
        let header = graph.header(obj)?;
        pending.extend(header.parent);
        pending.extend(header.children.iter().copied());
        pending.extend(graph.references(obj)?.into_iter().map(|(_, r)| r));
    }
    Ok(seen)
}

struct SaveState {
    ids: HashMap<ObjRef, u32>,
    symbols: SymbolTable,
}

impl SaveState {
    fn put_ref(&self, writer: &mut WireWriter, value: Option<ObjRef>) {
        match value.and_then(|obj| self.ids.get(&obj).map(|&id| (obj.tag, id))) {
            Some((tag, id)) => writer.put_ref(tag, id),
            None => writer.put_null_ref(),
        }
    }

    fn symbol(&self, text: &str) -> u32 {
        self.symbols.find(text).unwrap_or_default().0
    }
}

/// Serializes the objects reachable from `roots`.
///
/// # Errors
/// Returns `ModelError::DanglingReference` if a reference names a missing object.
pub fn save(graph: &Graph, roots: &[ObjRef]) -> Result<Bytes> {
    let objects = reachable(graph, roots)?;

    let mut ids = HashMap::with_capacity(objects.len());
    let mut counts: HashMap<u32, u32> = HashMap::new();
    let mut symbols = SymbolTable::new();
    for &obj in &objects {
        let count = counts.entry(obj.tag).or_default();
        *count += 1;
        ids.insert(obj, *count);

        let object = graph.object(obj)?;
        symbols.intern(&object.header().file);
        for value in object.values() {
            if let Value::Text(text) = value {
                symbols.intern(text);
            }
        }
    }
    let state = SaveState { ids, symbols };

    let mut writer = WireWriter::with_capacity(64 * objects.len().max(1));
    ArchiveHeader::current().encode(&mut writer);

    writer.put_u32(state.symbols.len() as u32);
    for (_, text) in state.symbols.iter() {
        writer.put_str(text);
    }

    writer.put_u32(roots.len() as u32);
    for &root in roots {
        state.put_ref(&mut writer, Some(root));
    }

    for entity in graph.resolution().concrete() {
        writer.put_u32(entity.tag);
        writer.put_u32(counts.get(&entity.tag).copied().unwrap_or(0));
    }

    for &obj in &objects {
        let object = graph.object(obj)?;
        put_header(&mut writer, &state, object.header());
        for (member, value) in graph.members(obj)?.iter().zip(object.values()) {
            put_value(&mut writer, &state, member, value);
        }
    }

    let bytes = writer.finish();
    debug!(
        objects = objects.len(),
        symbols = state.symbols.len(),
        bytes = bytes.len(),
        "archive saved"
    );
    Ok(bytes)
}

fn put_header(writer: &mut WireWriter, state: &SaveState, header: &ObjectHeader) {
    writer.put_u32(header.id);
    state.put_ref(writer, header.parent);
    writer.put_u32(state.symbol(&header.file));
    writer.put_u32(header.start_line);
    writer.put_u16(header.start_column);
    writer.put_u32(header.end_line);
    writer.put_u16(header.end_column);
    writer.put_u32(header.children.len() as u32);
    for &child in &header.children {
        state.put_ref(writer, Some(child));
    }
}

fn put_value(writer: &mut WireWriter, state: &SaveState, member: &Member, value: &Value) {
    match (member.scalar_kind(), value) {
        (Some(ScalarKind::Bool), Value::Bool(v)) => writer.put_bool(*v),
        (Some(ScalarKind::Int16), Value::Int(v)) => writer.put_i16(*v as i16),
        (Some(ScalarKind::Int32), Value::Int(v)) => writer.put_i32(*v as i32),
        (Some(ScalarKind::Int64), Value::Int(v)) => writer.put_i64(*v),
        (Some(ScalarKind::UInt16), Value::UInt(v)) => writer.put_u16(*v as u16),
        (Some(ScalarKind::UInt32), Value::UInt(v)) => writer.put_u32(*v as u32),
        (Some(ScalarKind::UInt64), Value::UInt(v)) => writer.put_u64(*v),
        (Some(_), Value::Text(text)) => writer.put_u32(state.symbol(text)),
        (None, Value::Ref(target)) => state.put_ref(writer, *target),
        (None, Value::Refs(None)) => writer.put_bool(false),
        (None, Value::Refs(Some(items))) => {
            writer.put_bool(true);
            writer.put_u32(items.len() as u32);
            for &item in items {
                state.put_ref(writer, Some(item));
            }
        }
        // Graph setters keep values and members in agreement.
        _ => {}
    }
}

/// Rebuilds a graph from an archive, returning it with its roots.
///
/// # Errors
/// Returns `ModelError::Core` for truncated or malformed archives, unknown
/// symbols and references outside the restored objects.
pub fn restore(
    bytes: Bytes,
    resolution: Arc<ResolutionContext>,
    policy: Arc<PolicyTable>,
) -> Result<(Graph, Vec<ObjRef>)> {
    let mut graph = Graph::new(resolution, policy)?;
    restore_into(&mut graph, bytes).map(|roots| (graph, roots))
}

/// Restores an archive into an empty graph built over the same schema as `template`.
///
/// # Errors
/// See [`restore`].
pub fn restore_like(template: &Graph, bytes: Bytes) -> Result<(Graph, Vec<ObjRef>)> {
    let mut graph = template.empty_like();
    restore_into(&mut graph, bytes).map(|roots| (graph, roots))
}

fn restore_into(graph: &mut Graph, bytes: Bytes) -> Result<Vec<ObjRef>> {
    let mut reader = WireReader::new(bytes);
    ArchiveHeader::decode(&mut reader)?;

    let mut symbols = SymbolTable::new();
    let symbol_count = reader.get_count(STR_MIN_LENGTH)?;
    for _ in 0..symbol_count {
        symbols.intern(&reader.get_str()?);
    }

    let root_count = reader.get_count(WireReader::REF_LENGTH)?;
    let mut roots = Vec::with_capacity(root_count as usize);
    for _ in 0..root_count {
        if let Some(root) = reader.get_ref()? {
            roots.push(root);
        }
    }

    let tags: Vec<u32> = graph.resolution().concrete().map(|e| e.tag).collect();
    let mut counts = Vec::with_capacity(tags.len());
    let mut total = 0u64;
    for &expected in &tags {
        let tag = reader.get_u32()?;
        if tag != expected {
            return Err(hdmgen_core::Error::UnknownTypeTag { tag }.into());
        }
        let count = reader.get_u32()?;
        total += u64::from(count);
        reader.check_count(total, HEADER_MIN_LENGTH)?;
        for _ in 0..count {
            graph.create_tag(tag)?;
        }
        counts.push((tag, count));
    }

    let mut last_id = 0;
    for (tag, count) in counts {
        for index in 0..count {
            let obj = ObjRef::new(tag, index);
            let header = get_header(&mut reader, graph, &symbols)?;
            last_id = last_id.max(header.id);
            *graph.header_mut(obj)? = header;

            let members = graph.members(obj)?.to_vec();
            let mut values = Vec::with_capacity(members.len());
            for member in &members {
                values.push(get_value(&mut reader, graph, &symbols, member)?);
            }
            *graph.values_mut(obj)? = values;
        }
    }
    graph.set_last_id(last_id);

    for &root in &roots {
        check_ref(graph, root)?;
    }
    debug!(objects = graph.len(), roots = roots.len(), "archive restored");
    Ok(roots)
}

fn check_ref(graph: &Graph, obj: ObjRef) -> Result<ObjRef> {
    if graph.contains(obj) {
        Ok(obj)
    } else {
        Err(ModelError::Core(hdmgen_core::Error::IndexOutOfRange {
            tag: obj.tag,
            index: obj.index,
            count: graph.count(obj.tag) as u32,
        }))
    }
}

fn get_ref(reader: &mut WireReader, graph: &Graph) -> Result<Option<ObjRef>> {
    reader.get_ref()?.map(|obj| check_ref(graph, obj)).transpose()
}

fn get_text(reader: &mut WireReader, symbols: &SymbolTable) -> Result<String> {
    let id = SymbolId(reader.get_u32()?);
    Ok(symbols.resolve(id)?.to_string())
}

fn get_header(reader: &mut WireReader, graph: &Graph, symbols: &SymbolTable) -> Result<ObjectHeader> {
    let mut header = ObjectHeader::with_id(reader.get_u32()?);
    header.parent = get_ref(reader, graph)?;
    header.file = get_text(reader, symbols)?;
    header.start_line = reader.get_u32()?;
    header.start_column = reader.get_u16()?;
    header.end_line = reader.get_u32()?;
    header.end_column = reader.get_u16()?;
    let children = reader.get_count(WireReader::REF_LENGTH)?;
    for _ in 0..children {
        if let Some(child) = get_ref(reader, graph)? {
            header.children.push(child);
        }
    }
    Ok(header)
}

fn get_value(
    reader: &mut WireReader,
    graph: &Graph,
    symbols: &SymbolTable,
    member: &Member,
) -> Result<Value> {
    Ok(match member.scalar_kind() {
        Some(ScalarKind::Bool) => Value::Bool(reader.get_bool()?),
        Some(ScalarKind::Int16) => Value::Int(i64::from(reader.get_i16()?)),
        Some(ScalarKind::Int32) => Value::Int(i64::from(reader.get_i32()?)),
        Some(ScalarKind::Int64) => Value::Int(reader.get_i64()?),
        Some(ScalarKind::UInt16) => Value::UInt(u64::from(reader.get_u16()?)),
        Some(ScalarKind::UInt32) => Value::UInt(u64::from(reader.get_u32()?)),
        Some(ScalarKind::UInt64) => Value::UInt(reader.get_u64()?),
        Some(ScalarKind::String | ScalarKind::Value | ScalarKind::Delay) => {
            Value::Text(get_text(reader, symbols)?)
        }
        None if member.is_many() => {
            if reader.get_bool()? {
                let len = reader.get_count(WireReader::REF_LENGTH)?;
                let mut items = Vec::with_capacity(len as usize);
                for _ in 0..len {
                    if let Some(item) = get_ref(reader, graph)? {
                        items.push(item);
                    }
                }
                Value::Refs(Some(items))
            } else {
                Value::Refs(None)
            }
        }
        None => Value::Ref(get_ref(reader, graph)?),
    })
}
