//! Dynamic Invoker: turns a [`ResolvedCall`] into concrete arguments, calls
//! the candidates in order and unwraps whatever they throw.

use adbridge_core::{
    pick_constant, AdFormat, ParamRole, ParamType, ResolvedCall, SdkFault, Signature, SETTER_ENUM_PREFERENCE,
};

use crate::adapter::{Activity, Arg, CallbackProxy, EnumValue, ProbeSurface};

/// Values available for role-bound slots.
#[derive(Clone, Copy)]
pub struct Bindings<'a> {
    pub activity: Option<&'a Activity>,
    pub identifier: Option<&'a str>,
    pub formats: &'a [AdFormat],
}

fn flags_arg(ty: &ParamType, formats: &[AdFormat]) -> Option<Arg> {
    if *ty == ParamType::IntArray {
        return Some(Arg::IntArray(formats.iter().map(|f| f.flag()).collect()));
    }
    if ty.is_int() {
        return Some(Arg::Int(formats.iter().fold(0, |acc, f| acc | f.flag())));
    }
    None
}

/// Arguments for `call`, or `None` when a slot cannot be filled. The
/// callback factory receives the interface name of the callback slot.
pub fn build_args(
    call: &ResolvedCall,
    bindings: Bindings<'_>,
    make_callback: &mut dyn FnMut(&str) -> Option<CallbackProxy>,
) -> Option<Vec<Arg>> {
    let mut args = Vec::with_capacity(call.slots.len());
    for (slot, role) in call.slots.iter().enumerate() {
        let ty = call.param(slot);
        let arg = match role {
            ParamRole::Context => Arg::Activity(bindings.activity?.clone()),
            ParamRole::Identifier => Arg::Str(bindings.identifier?.to_string()),
            ParamRole::Flags => flags_arg(ty, bindings.formats)?,
            ParamRole::Callback => match ty {
                ParamType::Interface(name) => Arg::Callback(make_callback(name)?),
                _ => return None,
            },
        };
        args.push(arg);
    }
    Some(args)
}

/// Call the candidates in order until one succeeds.
///
/// Candidates whose arguments cannot be built are skipped. On exhaustion the
/// last unwrapped fault is returned, or `NoSuchMethodException` when nothing
/// was even attempted.
pub fn invoke_first<S>(
    surface: &S,
    operation: &str,
    candidates: &[ResolvedCall],
    bindings: Bindings<'_>,
    make_callback: &mut dyn FnMut(&str) -> Option<CallbackProxy>,
) -> Result<ResolvedCall, SdkFault>
where
    S: ProbeSurface + ?Sized,
{
    let mut last: Option<SdkFault> = None;

    for call in candidates {
        let Some(args) = build_args(call, bindings, make_callback) else {
            tracing::debug!(%operation, signature = %call.signature, "skipping candidate: arguments unavailable");
            continue;
        };
        match surface.invoke(&call.signature, args) {
            Ok(_) => {
                tracing::info!(%operation, signature = %call.signature, "invoked");
                return Ok(call.clone());
            }
            Err(fault) => {
                let fault = fault.into_root_cause();
                tracing::warn!(
                    %operation,
                    signature = %call.signature,
                    reason = %fault.reason(),
                    "candidate failed"
                );
                last = Some(fault);
            }
        }
    }

    Err(last.unwrap_or_else(|| SdkFault::no_such_method(operation)))
}

/// Synthesized arguments for a consent/lgpd setter, `None` if any parameter
/// type is unsupported.
pub fn setter_args<F>(
    params: &[ParamType],
    activity: Option<&Activity>,
    status: Option<&EnumValue>,
    enum_constants: F,
) -> Option<Vec<Arg>>
where
    F: Fn(&str) -> Vec<String>,
{
    params
        .iter()
        .map(|ty| {
            if let (Some(activity), ParamType::Activity | ParamType::Context) = (activity, ty) {
                return Some(Arg::Activity(activity.clone()));
            }
            if let Some(enum_type) = ty.enum_name() {
                if let Some(status) = status.filter(|s| s.enum_type == enum_type) {
                    return Some(Arg::EnumConstant {
                        enum_type: status.enum_type.clone(),
                        name: status.name.clone(),
                    });
                }
                let name = pick_constant(SETTER_ENUM_PREFERENCE, &enum_constants(enum_type))?;
                return Some(Arg::EnumConstant {
                    enum_type: enum_type.to_string(),
                    name,
                });
            }
            // an untyped slot takes the status value itself
            if let (Some(status), ParamType::Object) = (status, ty) {
                return Some(Arg::EnumConstant {
                    enum_type: status.enum_type.clone(),
                    name: status.name.clone(),
                });
            }
            if ty.is_bool() {
                Some(Arg::Bool(true))
            } else if ty.is_int() {
                Some(Arg::Int(1))
            } else if ty.is_long() {
                Some(Arg::Long(1))
            } else if *ty == ParamType::Str {
                Some(Arg::Str("granted".to_string()))
            } else {
                None
            }
        })
        .collect()
}

/// Apply every setter once. Returns how many accepted their arguments.
pub fn apply_setters<S>(
    surface: &S,
    setters: &[&Signature],
    activity: Option<&Activity>,
    status: Option<&EnumValue>,
) -> usize
where
    S: ProbeSurface + ?Sized,
{
    let mut applied = 0;
    for setter in setters {
        let Some(args) = setter_args(&setter.params, activity, status, |t| surface.enum_constants(t)) else {
            continue;
        };
        match surface.invoke(setter, args) {
            Ok(_) => {
                tracing::info!(setter = %setter.name, "consent preconfigured via setter");
                applied += 1;
            }
            Err(fault) => {
                tracing::debug!(setter = %setter.name, reason = %fault.into_root_cause().reason(), "setter rejected");
            }
        }
    }
    applied
}
