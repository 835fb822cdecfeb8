//! Policy-driven deep clone with elaboration-time rebinding.
//!
//! The [`Cloner`] copies objects within one [`Graph`]. Reference members are
//! deep-cloned, aliased, rebound or conditionally uniquified according to the
//! [`PolicyTable`](hdmgen_schema::PolicyTable); whole entities may be
//! deduplicated by name or handled by one of the custom clone kinds. Binding
//! lookups go through an [`ElaborationContext`], for which [`Elaboration`]
//! is the reference implementation. A lookup miss keeps the original
//! reference.

use crate::error::Result;
use crate::graph::Graph;
use crate::value::Value;
use hdmgen_core::{ElaborationContext, ObjRef, ObjectHeader};
use hdmgen_schema::{
    BindingKind, ClonePolicy, CustomClone, EntityClone, EntityDef, KeySource, Member, MemberTag,
};
use std::collections::HashMap;
use tracing::debug;

/// Global clone switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CloneOptions {
    /// Deep-clone type specifications instead of sharing them.
    pub uniquify_typespecs: bool,
}

#[derive(Debug, Default)]
struct Frame {
    scope: Option<ObjRef>,
    nets: HashMap<String, ObjRef>,
    params: HashMap<String, ObjRef>,
    task_funcs: HashMap<String, ObjRef>,
}

/// Scoped binding tables used while elaborating a design.
///
/// Each entered scope opens a frame; bindings recorded inside it disappear
/// when the scope is left. Lookups search from the innermost frame outward.
/// Explicit bindings made with [`Elaboration::bind`] live in the outermost
/// table and are consulted first by `bind_any`.
#[derive(Debug)]
pub struct Elaboration {
    options: CloneOptions,
    any: HashMap<String, ObjRef>,
    frames: Vec<Frame>,
}

impl Default for Elaboration {
    fn default() -> Self {
        Self::new(CloneOptions::default())
    }
}

impl Elaboration {
    /// Creates an elaboration with an empty root frame.
    #[must_use]
    pub fn new(options: CloneOptions) -> Self {
        Self {
            options,
            any: HashMap::new(),
            frames: vec![Frame::default()],
        }
    }

    /// Binds `name` to `obj` for `bind_any` lookups.
    pub fn bind(&mut self, name: impl Into<String>, obj: ObjRef) {
        self.any.insert(name.into(), obj);
    }

    /// Innermost entered scope.
    #[must_use]
    pub fn current_scope(&self) -> Option<ObjRef> {
        self.frames.iter().rev().find_map(|f| f.scope)
    }

    /// Number of scopes currently entered.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    fn lookup(&self, table: impl Fn(&Frame) -> &HashMap<String, ObjRef>, name: &str) -> Option<ObjRef> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| table(frame).get(name).copied())
    }

    fn innermost(&mut self) -> &mut Frame {
        if self.frames.is_empty() {
            self.frames.push(Frame::default());
        }
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }
}

impl ElaborationContext for Elaboration {
    fn bind_any(&self, name: &str) -> Option<ObjRef> {
        self.any
            .get(name)
            .copied()
            .or_else(|| self.bind_net(name))
            .or_else(|| self.bind_param(name))
            .or_else(|| self.bind_task_func(name))
    }

    fn bind_net(&self, name: &str) -> Option<ObjRef> {
        self.lookup(|f| &f.nets, name)
    }

    fn bind_param(&self, name: &str) -> Option<ObjRef> {
        self.lookup(|f| &f.params, name)
    }

    fn bind_task_func(&self, name: &str) -> Option<ObjRef> {
        self.lookup(|f| &f.task_funcs, name)
    }

    fn record_net(&mut self, name: &str, obj: ObjRef) {
        self.innermost().nets.insert(name.to_string(), obj);
    }

    fn record_param(&mut self, name: &str, obj: ObjRef) {
        self.innermost().params.insert(name.to_string(), obj);
    }

    fn record_task_func(&mut self, name: &str, obj: ObjRef) {
        self.innermost().task_funcs.insert(name.to_string(), obj);
    }

    fn enter_scope(&mut self, scope: ObjRef) {
        self.frames.push(Frame {
            scope: Some(scope),
            ..Frame::default()
        });
    }

    fn leave_scope(&mut self, scope: ObjRef) {
        if self.frames.len() > 1 && self.frames.last().and_then(|f| f.scope) == Some(scope) {
            self.frames.pop();
        }
    }

    fn uniquify_typespecs(&self) -> bool {
        self.options.uniquify_typespecs
    }
}

/// Deep copier within one graph.
///
/// Each source object is cloned at most once per `Cloner`, so shared and
/// cyclic structure is preserved in the copy.
pub struct Cloner<'g, C: ElaborationContext> {
    graph: &'g mut Graph,
    cx: &'g mut C,
    memo: HashMap<ObjRef, ObjRef>,
}

impl<'g, C: ElaborationContext> Cloner<'g, C> {
    /// Creates a cloner allocating into `graph`.
    pub fn new(graph: &'g mut Graph, cx: &'g mut C) -> Self {
        Self {
            graph,
            cx,
            memo: HashMap::new(),
        }
    }

    /// The graph clones are allocated in.
    pub fn graph(&mut self) -> &mut Graph {
        self.graph
    }

    /// The elaboration context.
    pub fn context(&mut self) -> &mut C {
        self.cx
    }

    /// Returns the clone already made for `source`, if any.
    #[must_use]
    pub fn cloned(&self, source: ObjRef) -> Option<ObjRef> {
        self.memo.get(&source).copied()
    }

    /// Clones `obj` and everything its deep members reach, placing the copy
    /// under `parent`.
    ///
    /// # Errors
    /// Returns `ModelError::DanglingReference` if a cloned reference names a
    /// missing object.
    pub fn clone_object(&mut self, obj: ObjRef, parent: Option<ObjRef>) -> Result<ObjRef> {
        if let Some(done) = self.cloned(obj) {
            return Ok(done);
        }
        let resolution = self.graph.resolution_arc();
        let policy = self.graph.policy_arc();
        let chain = resolution.ancestors_of(self.graph.entity(obj)?);

        match policy.entity_clone(&chain) {
            EntityClone::Generic => self.generic(obj, parent, &chain, None),
            EntityClone::DedupByName(kind) => self.dedup(obj, parent, &chain, kind),
            EntityClone::Custom(CustomClone::Constant) => self.shallow(obj, parent),
            EntityClone::Custom(custom) => self.generic(obj, parent, &chain, Some(custom)),
        }
    }

    fn dedup(
        &mut self,
        obj: ObjRef,
        parent: Option<ObjRef>,
        chain: &[&EntityDef],
        kind: BindingKind,
    ) -> Result<ObjRef> {
        let name = self.graph.name(obj).unwrap_or_default().to_string();
        if name.is_empty() {
            return self.generic(obj, parent, chain, None);
        }
        let existing = match kind {
            BindingKind::Net => self.cx.bind_net(&name),
            BindingKind::Param => self.cx.bind_param(&name),
        };
        if let Some(existing) = existing {
            self.memo.insert(obj, existing);
            return Ok(existing);
        }
        let clone = self.generic(obj, parent, chain, None)?;
        match kind {
            BindingKind::Net => self.cx.record_net(&name, clone),
            BindingKind::Param => self.cx.record_param(&name, clone),
        }
        Ok(clone)
    }

    /// Copies scalars and shares every reference.
    fn shallow(&mut self, obj: ObjRef, parent: Option<ObjRef>) -> Result<ObjRef> {
        let source = self.graph.object(obj)?.clone();
        let clone = self.allocate(obj, parent, &source.header)?;
        *self.graph.values_mut(clone)? = source.values;
        Ok(clone)
    }

    fn allocate(
        &mut self,
        obj: ObjRef,
        parent: Option<ObjRef>,
        source: &ObjectHeader,
    ) -> Result<ObjRef> {
        let clone = self.graph.create_tag(obj.tag)?;
        self.memo.insert(obj, clone);
        let header = self.graph.header_mut(clone)?;
        let id = header.id;
        *header = source.clone();
        header.id = id;
        header.parent = parent;
        header.children.clear();
        Ok(clone)
    }

    fn generic(
        &mut self,
        obj: ObjRef,
        parent: Option<ObjRef>,
        chain: &[&EntityDef],
        custom: Option<CustomClone>,
    ) -> Result<ObjRef> {
        let source = self.graph.object(obj)?.clone();
        let clone = self.allocate(obj, parent, &source.header)?;
        let policy = self.graph.policy_arc();
        let name = self.graph.name(obj).unwrap_or_default().to_string();

        // Calls inside the body must see the new definition.
        if custom == Some(CustomClone::TaskFunc) && !name.is_empty() {
            self.cx.record_task_func(&name, clone);
        }
        let scoped = matches!(
            custom,
            Some(CustomClone::GenScopeArray | CustomClone::HierPath)
        ) || chain
            .iter()
            .any(|e| !policy.collector_buckets(&e.name).is_empty());
        if scoped {
            self.cx.enter_scope(clone);
        }

        let members = self.graph.members(obj)?.to_vec();
        let mut values = source.values;
        for (slot, member) in members.iter().enumerate() {
            if !member.is_reference() {
                continue;
            }
            let original = std::mem::replace(&mut values[slot], Value::Ref(None));
            values[slot] = match custom {
                Some(CustomClone::Call) if policy.is_traversal_excluded(chain, member) => {
                    self.map_refs(original, |this, item| {
                        Ok(this.cx.bind_task_func(&name).unwrap_or(item))
                    })?
                }
                Some(CustomClone::HierPath) if member.has_tag(MemberTag::BackReference) => {
                    self.map_refs(original, |this, item| Ok(this.rebind(item, &name)))?
                }
                Some(CustomClone::ContAssign) => self.map_refs(original, |this, item| {
                    match this.bound_net(item) {
                        Some(net) => Ok(net),
                        None => this.clone_object(item, Some(clone)),
                    }
                })?,
                _ => {
                    let member_policy = policy.clone_policy(chain, member);
                    let key = referrer_key(&member_policy, &members, &values);
                    self.apply(member_policy, original, clone, key)?
                }
            };
        }

        // Children already copied through a member map to that copy.
        let mut children = Vec::with_capacity(source.header.children.len());
        for &child in &source.header.children {
            children.push(self.clone_object(child, Some(clone))?);
        }

        if scoped {
            self.cx.leave_scope(clone);
        }
        let header = self.graph.header_mut(clone)?;
        header.children = children;
        *self.graph.values_mut(clone)? = values;
        Ok(clone)
    }

    fn apply(
        &mut self,
        policy: ClonePolicy,
        original: Value,
        clone: ObjRef,
        referrer_key: Option<String>,
    ) -> Result<Value> {
        match policy {
            ClonePolicy::Deep => {
                self.map_refs(original, |this, item| this.clone_object(item, Some(clone)))
            }
            ClonePolicy::Alias => Ok(original),
            ClonePolicy::Uniquify => {
                if self.cx.uniquify_typespecs() {
                    self.map_refs(original, |this, item| this.clone_object(item, Some(clone)))
                } else {
                    Ok(original)
                }
            }
            ClonePolicy::Rebind {
                source: KeySource::Referrer,
                ..
            } => match referrer_key {
                Some(key) => self.map_refs(original, |this, item| Ok(this.rebind(item, &key))),
                None => Ok(original),
            },
            ClonePolicy::Rebind {
                key,
                source: KeySource::Target,
            } => self.map_refs(original, |this, item| {
                let name = this.graph.key_text(item, &key).map(str::to_string);
                Ok(match name {
                    Some(name) => this.rebind(item, &name),
                    None => item,
                })
            }),
        }
    }

    fn rebind(&self, item: ObjRef, key: &str) -> ObjRef {
        match self.cx.bind_any(key) {
            Some(bound) => bound,
            None => {
                debug!(key, %item, "rebinding miss, keeping original reference");
                item
            }
        }
    }

    /// Net already elaborated under the name of the object `item` refers to.
    fn bound_net(&self, item: ObjRef) -> Option<ObjRef> {
        let name = self.graph.name(item)?;
        if name.is_empty() {
            return None;
        }
        self.cx.bind_net(name)
    }

    fn map_refs(
        &mut self,
        value: Value,
        mut f: impl FnMut(&mut Self, ObjRef) -> Result<ObjRef>,
    ) -> Result<Value> {
        Ok(match value {
            Value::Ref(Some(item)) => Value::Ref(Some(f(self, item)?)),
            Value::Refs(Some(items)) => {
                let mut mapped = Vec::with_capacity(items.len());
                for item in items {
                    mapped.push(f(self, item)?);
                }
                Value::Refs(Some(mapped))
            }
            other => other,
        })
    }
}

/// Text of the referrer's key member for referrer-keyed rebinding.
fn referrer_key(policy: &ClonePolicy, members: &[Member], values: &[Value]) -> Option<String> {
    let ClonePolicy::Rebind {
        key,
        source: KeySource::Referrer,
    } = policy
    else {
        return None;
    };
    let slot = members.iter().position(|m| &m.name == key)?;
    match &values[slot] {
        Value::Text(text) if !text.is_empty() => Some(text.clone()),
        _ => None,
    }
}

/// Clones `root` under `parent` with a fresh cloner.
///
/// # Errors
/// See [`Cloner::clone_object`].
pub fn clone_tree<C: ElaborationContext>(
    graph: &mut Graph,
    root: ObjRef,
    parent: Option<ObjRef>,
    cx: &mut C,
) -> Result<ObjRef> {
    Cloner::new(graph, cx).clone_object(root, parent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::compare;
    use crate::tests::sample_graph;
    use hdmgen_core::NoElaboration;

    #[test]
    fn test_deep_clone_copies_structure() {
        let mut graph = sample_graph();
        let module = graph.create("module").unwrap();
        let constant = graph.create("constant").unwrap();
        graph.set_text(module, "name", "top").unwrap();
        graph.set_text(constant, "value", "UINT:4").unwrap();
        graph.set_ref(module, "expr", Some(constant)).unwrap();

        let clone = clone_tree(&mut graph, module, None, &mut NoElaboration).unwrap();
        assert_ne!(clone, module);
        assert_eq!(graph.text(clone, "name").unwrap(), "top");
        let cloned_expr = graph.get_ref(clone, "expr").unwrap().unwrap();
        assert_ne!(cloned_expr, constant);
        assert_eq!(graph.header(cloned_expr).unwrap().parent, Some(clone));
        assert!(compare(&graph, module, &graph, clone).unwrap().is_equal());
    }

    #[test]
    fn test_clone_keeps_adopted_children() {
        let mut graph = sample_graph();
        let scope = graph.create("scope").unwrap();
        let a = graph.create("net").unwrap();
        let b = graph.create("net").unwrap();
        let constant = graph.create("constant").unwrap();
        graph.attach_child(scope, a).unwrap();
        graph.attach_child(scope, b).unwrap();
        graph.attach_child(scope, constant).unwrap();

        let clone = clone_tree(&mut graph, scope, None, &mut NoElaboration).unwrap();
        let children = graph.header(clone).unwrap().children.clone();
        assert_eq!(children.len(), graph.header(scope).unwrap().children.len());
        // Bucket copies and child list agree.
        let nets = graph.refs(clone, "nets").unwrap();
        assert_eq!(&children[..2], nets);
        assert!(!children.contains(&a) && !children.contains(&constant));
        for child in children {
            assert_eq!(graph.header(child).unwrap().parent, Some(clone));
        }
    }

    #[test]
    fn test_alias_member_shares_targets() {
        let mut graph = sample_graph();
        let module = graph.create("module").unwrap();
        let other = graph.create("module").unwrap();
        graph.push(module, "ref_modules", other).unwrap();

        let clone = clone_tree(&mut graph, module, None, &mut NoElaboration).unwrap();
        assert_eq!(graph.refs(clone, "ref_modules").unwrap(), [other]);
        assert_eq!(graph.count(module.tag), 3);
    }

    #[test]
    fn test_cycle_preserved() {
        let mut graph = sample_graph();
        let scope = graph.create("scope").unwrap();
        let array = graph.create("gen_scope_array").unwrap();
        graph.push(array, "scopes", scope).unwrap();
        graph.push(array, "scopes", scope).unwrap();

        let clone = clone_tree(&mut graph, array, None, &mut NoElaboration).unwrap();
        let scopes = graph.refs(clone, "scopes").unwrap();
        assert_eq!(scopes.len(), 2);
        assert_eq!(scopes[0], scopes[1]);
        assert_ne!(scopes[0], scope);
    }

    #[test]
    fn test_back_reference_rebinds_by_target_name() {
        let mut graph = sample_graph();
        let definition = graph.create("module").unwrap();
        let instance = graph.create("module").unwrap();
        let child = graph.create("module").unwrap();
        graph.set_text(definition, "name", "adder").unwrap();
        graph.set_ref(child, "instance", Some(definition)).unwrap();

        let mut cx = Elaboration::default();
        cx.bind("adder", instance);
        let clone = clone_tree(&mut graph, child, None, &mut cx).unwrap();
        assert_eq!(graph.get_ref(clone, "instance").unwrap(), Some(instance));

        let unbound = clone_tree(&mut graph, child, None, &mut Elaboration::default()).unwrap();
        assert_eq!(graph.get_ref(unbound, "instance").unwrap(), Some(definition));
    }

    #[test]
    fn test_referrer_keyed_rebind() {
        let mut graph = sample_graph();
        let reference = graph.create("ref_obj").unwrap();
        let original = graph.create("net").unwrap();
        let bound = graph.create("param").unwrap();
        graph.set_text(reference, "name", "WIDTH").unwrap();
        graph.set_ref(reference, "actual_group", Some(original)).unwrap();

        let mut cx = Elaboration::default();
        cx.record_param("WIDTH", bound);
        let clone = clone_tree(&mut graph, reference, None, &mut cx).unwrap();
        assert_eq!(graph.get_ref(clone, "actual_group").unwrap(), Some(bound));
    }

    #[test]
    fn test_typespec_uniquify_switch() {
        let mut graph = sample_graph();
        let net = graph.create("net").unwrap();
        let typespec = graph.create("constant").unwrap();
        graph.set_ref(net, "typespec", Some(typespec)).unwrap();

        let shared = clone_tree(&mut graph, net, None, &mut NoElaboration).unwrap();
        assert_eq!(graph.get_ref(shared, "typespec").unwrap(), Some(typespec));

        let mut cx = Elaboration::new(CloneOptions {
            uniquify_typespecs: true,
        });
        let unique = clone_tree(&mut graph, net, None, &mut cx).unwrap();
        let copied = graph.get_ref(unique, "typespec").unwrap().unwrap();
        assert_ne!(copied, typespec);
    }

    #[test]
    fn test_nets_deduplicated_by_name() {
        let mut graph = sample_graph();
        let scope = graph.create("scope").unwrap();
        let first = graph.create("net").unwrap();
        let second = graph.create("net").unwrap();
        graph.set_text(first, "name", "clk").unwrap();
        graph.set_text(second, "name", "clk").unwrap();
        graph.push(scope, "nets", first).unwrap();
        graph.push(scope, "nets", second).unwrap();

        let mut cx = Elaboration::default();
        let clone = clone_tree(&mut graph, scope, None, &mut cx).unwrap();
        let nets = graph.refs(clone, "nets").unwrap();
        assert_eq!(nets.len(), 2);
        assert_eq!(nets[0], nets[1]);
        // The scope frame holding "clk" was closed with the scope.
        assert_eq!(cx.bind_net("clk"), None);
        assert_eq!(cx.depth(), 0);
    }

    #[test]
    fn test_constant_is_shallow() {
        let mut graph = sample_graph();
        let constant = graph.create("constant").unwrap();
        graph.set_text(constant, "value", "INT:7").unwrap();
        let clone = clone_tree(&mut graph, constant, None, &mut NoElaboration).unwrap();
        assert_eq!(graph.text(clone, "value").unwrap(), "INT:7");
        assert_ne!(graph.header(clone).unwrap().id, graph.header(constant).unwrap().id);
    }

    #[test]
    fn test_call_rebinds_callee_to_cloned_function() {
        let mut graph = sample_graph();
        let function = graph.create("function").unwrap();
        let call = graph.create("func_call").unwrap();
        graph.set_text(function, "name", "fib").unwrap();
        graph.set_text(call, "name", "fib").unwrap();
        graph.set_ref(call, "function", Some(function)).unwrap();
        graph.push(function, "stmts", call).unwrap();

        let mut cx = Elaboration::default();
        let clone = clone_tree(&mut graph, function, None, &mut cx).unwrap();
        let cloned_call = graph.refs(clone, "stmts").unwrap()[0];
        assert_ne!(cloned_call, call);
        assert_eq!(graph.get_ref(cloned_call, "function").unwrap(), Some(clone));
        assert_eq!(cx.bind_task_func("fib"), Some(clone));
    }

    #[test]
    fn test_call_keeps_callee_on_miss() {
        let mut graph = sample_graph();
        let function = graph.create("function").unwrap();
        let call = graph.create("func_call").unwrap();
        graph.set_text(call, "name", "unknown").unwrap();
        graph.set_ref(call, "function", Some(function)).unwrap();

        let clone = clone_tree(&mut graph, call, None, &mut Elaboration::default()).unwrap();
        assert_eq!(graph.get_ref(clone, "function").unwrap(), Some(function));
        assert_eq!(graph.count(function.tag), 1);
    }

    #[test]
    fn test_cont_assign_reuses_elaborated_net() {
        let mut graph = sample_graph();
        let assign = graph.create("cont_assign").unwrap();
        let lhs = graph.create("net").unwrap();
        let rhs = graph.create("constant").unwrap();
        let elaborated = graph.create("net").unwrap();
        graph.set_text(lhs, "name", "out").unwrap();
        graph.set_ref(assign, "lhs", Some(lhs)).unwrap();
        graph.set_ref(assign, "rhs", Some(rhs)).unwrap();

        let mut cx = Elaboration::default();
        cx.record_net("out", elaborated);
        let clone = clone_tree(&mut graph, assign, None, &mut cx).unwrap();
        assert_eq!(graph.get_ref(clone, "lhs").unwrap(), Some(elaborated));
        let cloned_rhs = graph.get_ref(clone, "rhs").unwrap().unwrap();
        assert_ne!(cloned_rhs, rhs);
    }

    #[test]
    fn test_hier_path_back_reference_by_own_name() {
        let mut graph = sample_graph();
        let path = graph.create("hier_path").unwrap();
        let stale = graph.create("net").unwrap();
        let target = graph.create("net").unwrap();
        graph.set_text(path, "name", "u0.q").unwrap();
        graph.set_ref(path, "actual", Some(stale)).unwrap();

        let mut cx = Elaboration::default();
        cx.bind("u0.q", target);
        let clone = clone_tree(&mut graph, path, None, &mut cx).unwrap();
        assert_eq!(graph.get_ref(clone, "actual").unwrap(), Some(target));
        assert_eq!(cx.depth(), 0);
    }

    #[test]
    fn test_elaboration_scopes() {
        let mut cx = Elaboration::default();
        let outer = ObjRef::new(1, 0);
        let inner = ObjRef::new(1, 1);
        cx.record_net("a", ObjRef::new(3, 0));
        cx.enter_scope(outer);
        cx.record_net("a", ObjRef::new(3, 1));
        cx.enter_scope(inner);
        assert_eq!(cx.current_scope(), Some(inner));
        assert_eq!(cx.bind_net("a"), Some(ObjRef::new(3, 1)));
        // Mismatched leave is ignored.
        cx.leave_scope(outer);
        assert_eq!(cx.depth(), 2);
        cx.leave_scope(inner);
        cx.leave_scope(outer);
        assert_eq!(cx.bind_any("a"), Some(ObjRef::new(3, 0)));
        assert_eq!(cx.current_scope(), None);
    }
}
