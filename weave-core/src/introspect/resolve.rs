//! The Resolution Protocol
//!
//! Given an arbitrary trackable value and an optional member key, locate
//! the exact atom (or owning administration record) responsible for that
//! piece of state.
//!
//! Dispatch is a closed tagged enumeration: the collaborator layer tags
//! every value with its shape at construction time, and resolution is an
//! exhaustive match. Container arms come first; the shapes are mutually
//! exclusive by construction, so no arm re-validates another's claim.

use std::sync::Arc;

use tracing::debug;

use crate::containers::{ListAdmin, ObjectAdmin, ObservableList, ObservableMap, ObservableObject, ObservableSet};
use crate::reactive::{Atom, DerivedState, Disposer, Reaction};
use crate::value::Value;

use super::error::{describe, ResolveError};

/// A value submitted for resolution, tagged with its runtime shape.
///
/// `Plain` carries values that are not trackable at all; resolving one
/// fails with [`ResolveError::NotObservable`] (or
/// [`ResolveError::InvalidArgument`] for a null administration target).
#[derive(Clone, Debug)]
pub enum Observable {
    /// A list-like container.
    List(ObservableList),
    /// A set-like container.
    Set(ObservableSet),
    /// A map-like container.
    Map(ObservableMap),
    /// An object-like container with named members.
    Object(ObservableObject),
    /// A raw atom.
    Atom(Arc<Atom>),
    /// A derived value.
    Derived(Arc<DerivedState>),
    /// A reaction.
    Reaction(Reaction),
    /// A disposer carrying its reaction.
    Disposer(Arc<Disposer>),
    /// Any other value; not trackable.
    Plain(Value),
}

/// A node in the dependency tree: the result of [`get_atom`].
#[derive(Clone, Debug)]
pub enum DepNode {
    /// A leaf atom.
    Atom(Arc<Atom>),
    /// A derived value.
    Derived(Arc<DerivedState>),
    /// A reaction.
    Reaction(Reaction),
}

impl DepNode {
    /// The node's diagnostic name.
    pub fn name(&self) -> &str {
        match self {
            DepNode::Atom(atom) => atom.name(),
            DepNode::Derived(derived) => derived.name(),
            DepNode::Reaction(reaction) => reaction.name(),
        }
    }

    /// The underlying atom, if this node is one.
    pub fn as_atom(&self) -> Option<&Arc<Atom>> {
        match self {
            DepNode::Atom(atom) => Some(atom),
            _ => None,
        }
    }
}

/// An owning administration record: the result of [`get_administration`].
///
/// A leaf node doubles as its own administration record at that
/// granularity; map-like and set-like containers serve as their own.
#[derive(Clone, Debug)]
pub enum Administration {
    /// A leaf atom.
    Atom(Arc<Atom>),
    /// A derived value.
    Derived(Arc<DerivedState>),
    /// A reaction.
    Reaction(Reaction),
    /// A list's administration record.
    List(Arc<ListAdmin>),
    /// A set; serves as its own administration record.
    Set(ObservableSet),
    /// A map; serves as its own administration record.
    Map(ObservableMap),
    /// An object's administration record.
    Object(Arc<ObjectAdmin>),
}

impl Administration {
    /// The record's diagnostic name.
    pub fn name(&self) -> &str {
        match self {
            Administration::Atom(atom) => atom.name(),
            Administration::Derived(derived) => derived.name(),
            Administration::Reaction(reaction) => reaction.name(),
            Administration::List(admin) => admin.name(),
            Administration::Set(set) => set.name(),
            Administration::Map(map) => map.name(),
            Administration::Object(admin) => admin.name(),
        }
    }
}

impl From<DepNode> for Administration {
    fn from(node: DepNode) -> Self {
        match node {
            DepNode::Atom(atom) => Administration::Atom(atom),
            DepNode::Derived(derived) => Administration::Derived(derived),
            DepNode::Reaction(reaction) => Administration::Reaction(reaction),
        }
    }
}

/// Locate the atom responsible for `thing`, or for one member of it.
///
/// Container shapes resolve to the unit guarding the requested
/// granularity; atoms, derived values, and reactions resolve to
/// themselves (`property` is ignored for them, they have no sub-keys);
/// disposers resolve to their attached reaction.
pub fn get_atom(thing: &Observable, property: Option<&Value>) -> Result<DepNode, ResolveError> {
    match thing {
        Observable::List(list) => {
            // Index-level tracking is not supported; the whole list is one
            // unit.
            if property.is_some() {
                debug!(container = %list.name(), "member atoms requested from a list");
                return Err(ResolveError::UnsupportedOperation {
                    container: describe(|| list.name().to_string()),
                });
            }
            Ok(DepNode::Atom(Arc::clone(list.admin().atom())))
        }

        // Sets have no addressable sub-key; the property, if any, is
        // ignored.
        Observable::Set(set) => Ok(DepNode::Atom(Arc::clone(set.atom()))),

        Observable::Map(map) => match property {
            None => Ok(DepNode::Atom(Arc::clone(map.keys_atom()))),
            Some(key) => map
                .value_atom(key)
                .or_else(|| map.has_atom(key))
                .map(DepNode::Atom)
                .ok_or_else(|| {
                    debug!(container = %map.name(), key = %key, "map entry not found");
                    ResolveError::EntryNotFound {
                        container: describe(|| map.name().to_string()),
                        key: describe(|| key.to_string()),
                    }
                }),
        },

        Observable::Object(object) => {
            let Some(property) = property else {
                return Err(ResolveError::MissingProperty {
                    container: describe(|| object.name().to_string()),
                });
            };
            let member = property.to_string();

            // Defensive touch: a declared member that has never been read
            // has no atom yet; materialize it before the lookup.
            if !object.admin().has_member_atom(&member) {
                object.touch(&member);
            }

            object
                .admin()
                .member_atom(&member)
                .map(DepNode::Atom)
                .ok_or_else(|| {
                    debug!(container = %object.name(), member = %member, "object member not found");
                    ResolveError::EntryNotFound {
                        container: describe(|| object.name().to_string()),
                        key: describe(|| member.clone()),
                    }
                })
        }

        Observable::Atom(atom) => Ok(DepNode::Atom(Arc::clone(atom))),
        Observable::Derived(derived) => Ok(DepNode::Derived(Arc::clone(derived))),
        Observable::Reaction(reaction) => Ok(DepNode::Reaction(reaction.clone())),
        Observable::Disposer(disposer) => Ok(DepNode::Reaction(disposer.reaction().clone())),

        Observable::Plain(value) => Err(ResolveError::NotObservable {
            value: describe(|| value.to_string()),
        }),
    }
}

/// Locate the administration record owning `thing`, or the leaf unit for
/// one member of it.
///
/// A null target fails with [`ResolveError::InvalidArgument`] before any
/// shape inspection.
pub fn get_administration(
    thing: &Observable,
    property: Option<&Value>,
) -> Result<Administration, ResolveError> {
    if matches!(thing, Observable::Plain(Value::Null)) {
        return Err(ResolveError::InvalidArgument);
    }

    // A leaf unit doubles as its own administration record at that
    // granularity.
    if property.is_some() {
        return get_atom(thing, property).map(Administration::from);
    }

    match thing {
        Observable::Atom(atom) => Ok(Administration::Atom(Arc::clone(atom))),
        Observable::Derived(derived) => Ok(Administration::Derived(Arc::clone(derived))),
        Observable::Reaction(reaction) => Ok(Administration::Reaction(reaction.clone())),
        Observable::Disposer(disposer) => {
            Ok(Administration::Reaction(disposer.reaction().clone()))
        }
        Observable::Set(set) => Ok(Administration::Set(set.clone())),
        Observable::Map(map) => Ok(Administration::Map(map.clone())),
        Observable::Object(object) => Ok(Administration::Object(Arc::clone(object.admin()))),
        Observable::List(list) => Ok(Administration::List(Arc::clone(list.admin()))),
        Observable::Plain(value) => Err(ResolveError::NotObservable {
            value: describe(|| value.to_string()),
        }),
    }
}

/// The diagnostic name of whatever `thing` (or `thing.property`) resolves
/// to.
pub fn get_debug_name(
    thing: &Observable,
    property: Option<&Value>,
) -> Result<String, ResolveError> {
    let name = if property.is_some() {
        get_atom(thing, property)?.name().to_string()
    } else {
        match thing {
            Observable::Object(_) | Observable::Map(_) | Observable::Set(_) => {
                get_administration(thing, None)?.name().to_string()
            }
            // Valid for lists as well: they resolve through their
            // structural atom.
            _ => get_atom(thing, None)?.name().to_string(),
        }
    };

    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspect::error::DIAGNOSTICS_TEST_GUARD;
    use crate::reactive::{autorun, Derived};

    fn settings_map() -> ObservableMap {
        let map = ObservableMap::named("settings");
        map.insert(Value::from("volume"), Value::from(7i64));
        map
    }

    #[test]
    fn list_resolves_to_its_structural_atom() {
        let list = ObservableList::named("numbers");

        let node = get_atom(&Observable::List(list.clone()), None).unwrap();
        assert!(Arc::ptr_eq(node.as_atom().unwrap(), list.admin().atom()));
    }

    #[test]
    fn list_member_resolution_is_unsupported() {
        let list = ObservableList::named("numbers");

        let err = get_atom(&Observable::List(list), Some(&Value::from("len"))).unwrap_err();
        assert!(matches!(err, ResolveError::UnsupportedOperation { .. }));
    }

    #[test]
    fn set_resolves_to_its_atom_ignoring_property() {
        let set = ObservableSet::named("tags");

        let bare = get_atom(&Observable::Set(set.clone()), None).unwrap();
        let with_property =
            get_atom(&Observable::Set(set.clone()), Some(&Value::from("x"))).unwrap();

        assert!(Arc::ptr_eq(bare.as_atom().unwrap(), set.atom()));
        assert!(Arc::ptr_eq(with_property.as_atom().unwrap(), set.atom()));
    }

    #[test]
    fn map_without_property_resolves_to_keys_atom() {
        let map = settings_map();

        let node = get_atom(&Observable::Map(map.clone()), None).unwrap();
        assert!(Arc::ptr_eq(node.as_atom().unwrap(), map.keys_atom()));
    }

    #[test]
    fn map_member_resolves_to_value_atom() {
        let map = settings_map();
        let key = Value::from("volume");

        let node = get_atom(&Observable::Map(map.clone()), Some(&key)).unwrap();
        assert!(Arc::ptr_eq(
            node.as_atom().unwrap(),
            &map.value_atom(&key).unwrap()
        ));
    }

    #[test]
    fn map_member_falls_back_to_presence_atom() {
        let map = settings_map();
        let key = Value::from("brightness");

        // Observing the absent key creates a presence entry.
        map.has(&key);

        let node = get_atom(&Observable::Map(map.clone()), Some(&key)).unwrap();
        assert!(Arc::ptr_eq(
            node.as_atom().unwrap(),
            &map.has_atom(&key).unwrap()
        ));
    }

    #[test]
    fn absent_map_key_fails_with_entry_not_found() {
        let _guard = DIAGNOSTICS_TEST_GUARD.lock().expect("guard poisoned");
        let map = settings_map();

        let err =
            get_atom(&Observable::Map(map), Some(&Value::from("brightness"))).unwrap_err();

        match err {
            ResolveError::EntryNotFound { container, key } => {
                assert_eq!(container, "settings");
                assert_eq!(key, "brightness");
            }
            other => panic!("expected EntryNotFound, got {other:?}"),
        }
    }

    #[test]
    fn object_requires_a_property() {
        let object = ObservableObject::named("profile");

        let err = get_atom(&Observable::Object(object), None).unwrap_err();
        assert!(matches!(err, ResolveError::MissingProperty { .. }));
    }

    #[test]
    fn object_member_resolves_even_before_first_read() {
        let object = ObservableObject::named("profile");
        object.declare("age", Value::from(30i64));

        // Never read, so no atom exists yet; the defensive touch
        // materializes it.
        let node =
            get_atom(&Observable::Object(object.clone()), Some(&Value::from("age"))).unwrap();

        assert_eq!(node.name(), "profile.age");
        assert!(Arc::ptr_eq(
            node.as_atom().unwrap(),
            &object.admin().member_atom("age").unwrap()
        ));
    }

    #[test]
    fn undeclared_object_member_fails_with_entry_not_found() {
        let _guard = DIAGNOSTICS_TEST_GUARD.lock().expect("guard poisoned");
        let object = ObservableObject::named("profile");

        let err =
            get_atom(&Observable::Object(object), Some(&Value::from("age"))).unwrap_err();

        match err {
            ResolveError::EntryNotFound { container, key } => {
                assert_eq!(container, "profile");
                assert_eq!(key, "age");
            }
            other => panic!("expected EntryNotFound, got {other:?}"),
        }
    }

    #[test]
    fn atoms_derived_values_and_reactions_resolve_to_themselves() {
        let atom = Atom::new("standalone");
        let derived = Derived::named("doubled", || 2);
        let disposer = autorun(|| {});

        let node = get_atom(&Observable::Atom(Arc::clone(&atom)), None).unwrap();
        assert!(Arc::ptr_eq(node.as_atom().unwrap(), &atom));

        // Property is ignored for leaf shapes.
        let node =
            get_atom(&Observable::Atom(Arc::clone(&atom)), Some(&Value::from("x"))).unwrap();
        assert!(Arc::ptr_eq(node.as_atom().unwrap(), &atom));

        let node =
            get_atom(&Observable::Derived(Arc::clone(derived.state())), None).unwrap();
        assert_eq!(node.name(), "doubled");

        let reaction = disposer.reaction().clone();
        let node = get_atom(&Observable::Reaction(reaction.clone()), None).unwrap();
        match node {
            DepNode::Reaction(resolved) => assert!(resolved.same_reaction(&reaction)),
            other => panic!("expected a reaction, got {other:?}"),
        }
    }

    #[test]
    fn disposer_resolves_to_its_reaction() {
        let disposer = Arc::new(autorun(|| {}));
        let expected = disposer.reaction().clone();

        let node = get_atom(&Observable::Disposer(disposer), None).unwrap();
        match node {
            DepNode::Reaction(resolved) => assert!(resolved.same_reaction(&expected)),
            other => panic!("expected a reaction, got {other:?}"),
        }
    }

    #[test]
    fn plain_values_are_not_observable() {
        let err = get_atom(&Observable::Plain(Value::from(42i64)), None).unwrap_err();
        assert!(matches!(err, ResolveError::NotObservable { .. }));

        let err = get_atom(&Observable::Plain(Value::Null), None).unwrap_err();
        assert!(matches!(err, ResolveError::NotObservable { .. }));
    }

    #[test]
    fn administration_rejects_null_before_shape_inspection() {
        let err = get_administration(&Observable::Plain(Value::Null), None).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidArgument));

        // Even with a property, null fails as InvalidArgument, not
        // NotObservable.
        let err = get_administration(&Observable::Plain(Value::Null), Some(&Value::from("x")))
            .unwrap_err();
        assert!(matches!(err, ResolveError::InvalidArgument));
    }

    #[test]
    fn administration_with_property_is_the_member_atom() {
        let object = ObservableObject::named("profile");
        object.declare("age", Value::from(30i64));
        let key = Value::from("age");

        let node = get_atom(&Observable::Object(object.clone()), Some(&key)).unwrap();
        let admin =
            get_administration(&Observable::Object(object), Some(&key)).unwrap();

        match admin {
            Administration::Atom(atom) => {
                assert!(Arc::ptr_eq(&atom, node.as_atom().unwrap()));
            }
            other => panic!("expected an atom, got {other:?}"),
        }
    }

    #[test]
    fn maps_and_sets_are_their_own_administration() {
        let map = settings_map();
        let set = ObservableSet::named("tags");

        let admin = get_administration(&Observable::Map(map.clone()), None).unwrap();
        assert_eq!(admin.name(), "settings");

        let admin = get_administration(&Observable::Set(set), None).unwrap();
        assert_eq!(admin.name(), "tags");
    }

    #[test]
    fn containers_resolve_to_their_admin_records() {
        let list = ObservableList::named("numbers");
        let object = ObservableObject::named("profile");

        let admin = get_administration(&Observable::List(list.clone()), None).unwrap();
        match admin {
            Administration::List(record) => assert!(Arc::ptr_eq(&record, list.admin())),
            other => panic!("expected a list admin, got {other:?}"),
        }

        let admin = get_administration(&Observable::Object(object.clone()), None).unwrap();
        match admin {
            Administration::Object(record) => assert!(Arc::ptr_eq(&record, object.admin())),
            other => panic!("expected an object admin, got {other:?}"),
        }
    }

    #[test]
    fn debug_names_resolve_per_shape() {
        let map = settings_map();
        let list = ObservableList::named("numbers");
        let object = ObservableObject::named("profile");
        object.declare("age", Value::from(30i64));

        assert_eq!(
            get_debug_name(&Observable::Map(map.clone()), None).unwrap(),
            "settings"
        );
        assert_eq!(
            get_debug_name(&Observable::Map(map), Some(&Value::from("volume"))).unwrap(),
            "settings.volume"
        );
        assert_eq!(
            get_debug_name(&Observable::List(list), None).unwrap(),
            "numbers"
        );
        assert_eq!(
            get_debug_name(&Observable::Object(object.clone()), None).unwrap(),
            "profile"
        );
        assert_eq!(
            get_debug_name(&Observable::Object(object), Some(&Value::from("age"))).unwrap(),
            "profile.age"
        );
    }

    #[test]
    fn debug_name_of_plain_value_fails_not_observable() {
        let plain: crate::value::RefValue = Arc::new(());
        let err =
            get_debug_name(&Observable::Plain(Value::reference(plain)), None).unwrap_err();
        assert!(matches!(err, ResolveError::NotObservable { .. }));
    }
}
