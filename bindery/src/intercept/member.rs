use std::fmt;

/// What a member of an intercepted contract stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Method,
    /// Property read accessor.
    Getter,
    /// Property write accessor.
    Setter,
    /// Event subscription accessor.
    EventAdd,
    /// Event unsubscription accessor.
    EventRemove,
}

impl MemberKind {
    pub fn is_property(self) -> bool {
        matches!(self, MemberKind::Getter | MemberKind::Setter)
    }

    pub fn is_event(self) -> bool {
        matches!(self, MemberKind::EventAdd | MemberKind::EventRemove)
    }
}

/// How an argument travels between the caller and the target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Passed to the target only.
    In,
    /// Passed to the target and written back to the caller afterwards.
    Ref,
    /// Starts empty and is written back to the caller if set.
    Out,
}

/// Static description of one parameter of a member.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Parameter {
    name: &'static str,
    type_name: &'static str,
    direction: Direction,
}

impl Parameter {
    pub const fn new(name: &'static str, type_name: &'static str, direction: Direction) -> Self {
        Self {
            name,
            type_name,
            direction,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

/// Static description of a callable member of an intercepted contract.
///
/// Members are produced once per contract, usually by `#[interceptable]`, and
/// live in statics so that invocations can refer to them by `&'static`.
#[derive(Debug, PartialEq, Eq)]
pub struct Member {
    contract: &'static str,
    name: &'static str,
    kind: MemberKind,
    property: Option<&'static str>,
    parameters: &'static [Parameter],
    return_type: Option<&'static str>,
}

impl Member {
    pub const fn new(
        contract: &'static str,
        name: &'static str,
        kind: MemberKind,
        parameters: &'static [Parameter],
        return_type: Option<&'static str>,
    ) -> Self {
        Self {
            contract,
            name,
            kind,
            property: None,
            parameters,
            return_type,
        }
    }

    /// Marks the member as an accessor of the property or event `property`.
    pub const fn accessor_of(mut self, property: &'static str) -> Self {
        self.property = Some(property);
        self
    }

    pub fn contract(&self) -> &'static str {
        self.contract
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    /// Name of the property or event this member accesses, if any.
    pub fn property(&self) -> Option<&'static str> {
        self.property
    }

    pub fn parameters(&self) -> &'static [Parameter] {
        self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<(usize, &'static Parameter)> {
        self.parameters
            .iter()
            .enumerate()
            .find(|(_, p)| p.name == name)
    }

    /// Type of the return value, `None` for members returning `()`.
    pub fn return_type(&self) -> Option<&'static str> {
        self.return_type
    }

    pub(crate) fn id(&self) -> (&'static str, &'static str) {
        (self.contract, self.name)
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.contract, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static PARAMS: [Parameter; 2] = [
        Parameter::new("key", "String", Direction::In),
        Parameter::new("value", "u32", Direction::Out),
    ];

    static LOOKUP: Member = Member::new("Store", "lookup", MemberKind::Method, &PARAMS, Some("bool"));

    static GET_SIZE: Member =
        Member::new("Store", "get_size", MemberKind::Getter, &[], Some("usize")).accessor_of("size");

    #[test]
    fn test_member_description() {
        assert_eq!(LOOKUP.to_string(), "Store::lookup");
        assert_eq!(LOOKUP.parameters().len(), 2);
        let (index, param) = LOOKUP.parameter("value").unwrap();
        assert_eq!(index, 1);
        assert_eq!(param.direction(), Direction::Out);
        assert!(LOOKUP.property().is_none());
        assert!(GET_SIZE.kind().is_property());
        assert_eq!(GET_SIZE.property(), Some("size"));
    }
}
