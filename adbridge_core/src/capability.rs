//! Capability negotiation: pick a usable call shape out of whatever overloads
//! the installed SDK release advertises.
//!
//! The SDK adapter reports its overloads as [`Signature`] values. Callers
//! describe what they need with a [`CapabilityDescriptor`] and get back an
//! ordered list of [`ResolvedCall`] candidates to try in turn.

/// Parameter type as advertised by the SDK adapter.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ParamType {
    Activity,
    Context,
    /// Root object type; assignable from an activity.
    Object,
    Str,
    Int,
    BoxedInt,
    IntArray,
    Bool,
    BoxedBool,
    Long,
    BoxedLong,
    /// Enum type, by name.
    Enum(String),
    /// Callback interface, by name.
    Interface(String),
    /// Any other concrete class, by name.
    Class(String),
}

impl ParamType {
    /// True when an activity can be passed for this parameter.
    pub fn accepts_activity(&self) -> bool {
        matches!(self, ParamType::Activity | ParamType::Context | ParamType::Object)
    }

    pub fn is_int(&self) -> bool {
        matches!(self, ParamType::Int | ParamType::BoxedInt)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, ParamType::Bool | ParamType::BoxedBool)
    }

    pub fn is_long(&self) -> bool {
        matches!(self, ParamType::Long | ParamType::BoxedLong)
    }

    pub fn enum_name(&self) -> Option<&str> {
        match self {
            ParamType::Enum(name) => Some(name),
            _ => None,
        }
    }
}

/// One overload on the external surface.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Signature {
    pub name: String,
    pub is_static: bool,
    pub params: Vec<ParamType>,
}

impl Signature {
    pub fn new(name: impl Into<String>, params: Vec<ParamType>) -> Self {
        Self {
            name: name.into(),
            is_static: true,
            params,
        }
    }

    pub fn instance(name: impl Into<String>, params: Vec<ParamType>) -> Self {
        Self {
            name: name.into(),
            is_static: false,
            params,
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{p:?}")?;
        }
        f.write_str(")")
    }
}

/// What a parameter slot is used for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamRole {
    /// The foreground activity, or any supertype of it.
    Context,
    /// The caller-supplied key.
    Identifier,
    /// Ad-format flags, scalar or array.
    Flags,
    /// A callback interface.
    Callback,
}

impl ParamRole {
    pub fn accepts(self, ty: &ParamType) -> bool {
        match self {
            ParamRole::Context => ty.accepts_activity(),
            ParamRole::Identifier => *ty == ParamType::Str,
            ParamRole::Flags => ty.is_int() || *ty == ParamType::IntArray,
            ParamRole::Callback => matches!(ty, ParamType::Interface(_)),
        }
    }
}

/// Requirements for one target operation. Built once per operation kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CapabilityDescriptor {
    pub operation: &'static str,
    /// Fixed leading roles.
    pub roles: &'static [ParamRole],
    /// Whether a trailing callback parameter is allowed.
    pub optional_callback: bool,
    /// Try callback-bearing overloads before callback-less ones.
    pub prefer_callback: bool,
}

impl CapabilityDescriptor {
    /// `initialize(context, key, flags[, callback])`.
    pub const INITIALIZE: CapabilityDescriptor = CapabilityDescriptor {
        operation: "initialize",
        roles: &[ParamRole::Context, ParamRole::Identifier, ParamRole::Flags],
        optional_callback: true,
        prefer_callback: true,
    };

    /// `cache(flags)`.
    pub const CACHE: CapabilityDescriptor = CapabilityDescriptor {
        operation: "cache",
        roles: &[ParamRole::Flags],
        optional_callback: false,
        prefer_callback: false,
    };

    /// `cache(context, flags)`.
    pub const CACHE_WITH_CONTEXT: CapabilityDescriptor = CapabilityDescriptor {
        operation: "cache",
        roles: &[ParamRole::Context, ParamRole::Flags],
        optional_callback: false,
        prefer_callback: false,
    };

    fn match_signature(&self, sig: &Signature) -> Option<ResolvedCall> {
        if !sig.is_static || sig.name != self.operation {
            return None;
        }

        let fixed = self.roles.len();
        let awaits_callback = if sig.arity() == fixed {
            false
        } else if self.optional_callback && sig.arity() == fixed + 1 {
            true
        } else {
            return None;
        };

        let mut slots: Vec<ParamRole> = self.roles.to_vec();
        if awaits_callback {
            slots.push(ParamRole::Callback);
        }

        let compatible = slots
            .iter()
            .zip(sig.params.iter())
            .all(|(role, ty)| role.accepts(ty));
        if !compatible {
            return None;
        }

        Some(ResolvedCall {
            signature: sig.clone(),
            slots,
            awaits_callback,
        })
    }
}

/// A concrete overload with a role bound to every parameter slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedCall {
    pub signature: Signature,
    /// `slots[i]` is the role of `signature.params[i]`.
    pub slots: Vec<ParamRole>,
    pub awaits_callback: bool,
}

impl ResolvedCall {
    pub fn param(&self, slot: usize) -> &ParamType {
        &self.signature.params[slot]
    }
}

/// All overloads matching `desc`, in the order they should be tried.
///
/// Callback-bearing candidates come first when the descriptor prefers them;
/// otherwise the advertised order is kept. An empty result means the
/// capability is absent, which callers treat as recoverable.
pub fn probe(desc: &CapabilityDescriptor, methods: &[Signature]) -> Vec<ResolvedCall> {
    let mut out: Vec<ResolvedCall> = methods.iter().filter_map(|m| desc.match_signature(m)).collect();
    if desc.prefer_callback {
        // stable: keeps advertised order within each group
        out.sort_by_key(|c| !c.awaits_callback);
    }
    out
}

/// Setters whose name carries one of the outcome verbs (`setXConsent...`,
/// `setXLgpd...`). Every match is an independent best-effort candidate.
pub fn outcome_setters<'a>(methods: &'a [Signature], verbs: &[&str], static_only: bool) -> Vec<&'a Signature> {
    methods
        .iter()
        .filter(|m| !static_only || m.is_static)
        .filter(|m| {
            let lo = m.name.to_ascii_lowercase();
            lo.starts_with("set") && verbs.iter().any(|v| lo.contains(v))
        })
        .collect()
}

/// Operations whose name mentions any of `needles` (case-insensitive).
pub fn mentioning<'a>(methods: &'a [Signature], needles: &[&str]) -> Vec<&'a Signature> {
    methods
        .iter()
        .filter(|m| {
            let lo = m.name.to_ascii_lowercase();
            needles.iter().any(|n| lo.contains(n))
        })
        .collect()
}

/// First static overload named `name` with exactly `params`.
pub fn find_exact<'a>(methods: &'a [Signature], name: &str, params: &[ParamType]) -> Option<&'a Signature> {
    methods
        .iter()
        .find(|m| m.is_static && m.name == name && m.params == params)
}

/// First static single-parameter overload named `name` whose parameter
/// satisfies `pred`.
pub fn find_unary<'a, F>(methods: &'a [Signature], name: &str, pred: F) -> Option<&'a Signature>
where
    F: Fn(&ParamType) -> bool,
{
    methods
        .iter()
        .find(|m| m.is_static && m.name == name && m.arity() == 1 && pred(&m.params[0]))
}
