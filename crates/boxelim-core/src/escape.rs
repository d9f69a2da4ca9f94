//! Escape analysis and per-call-site safety verdicts.
//!
//! Consumes the stabilized frames and classifies every generic `next()`
//! call site: safe to specialize, or not. An escape event is any use of a
//! refined value other than the recognized iteration/unboxing path:
//! storing it to a field, returning it, comparing it by reference, or
//! passing it to a call whose effect on it is not explicitly recognized.
//! Escapes are recorded per primitive kind within the method; anything
//! ambiguous is conservatively unsafe.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use boxelim_bytecode::{intrinsics, CallKind, Cfg, Insn, MethodBody, MethodRef, PrimitiveKind};

use crate::frame::Frame;
use crate::solver::Frames;
use crate::value::AbstractValue;

/// Why a call site was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnsafeReason {
    /// The receiver is not a definite progression iterator (`Conflict`, or
    /// never refined at all).
    ReceiverUnrefined,
    /// The receiver's iterator identity escapes somewhere in the method.
    IteratorEscapes,
    /// The boxed result is not consumed by an immediate unboxing call.
    ResultNotUnboxed,
    /// The following unbox instruction is shared with another path and
    /// cannot be deleted.
    UnboxShared,
    /// The adjacent unbox call is for a different primitive kind.
    KindMismatch,
}

/// Verdict for one generic `next()` call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CallSiteVerdict {
    pub kind: Option<PrimitiveKind>,
    pub safe: bool,
    pub reason: Option<UnsafeReason>,
}

impl CallSiteVerdict {
    fn safe(kind: PrimitiveKind) -> Self {
        Self {
            kind: Some(kind),
            safe: true,
            reason: None,
        }
    }

    fn unsafe_because(kind: Option<PrimitiveKind>, reason: UnsafeReason) -> Self {
        Self {
            kind,
            safe: false,
            reason: Some(reason),
        }
    }
}

pub struct SafetyChecker;

impl SafetyChecker {
    /// Classify every generic `next()` call site in `body`. Pure; the
    /// verdict map is keyed by instruction index, in program order.
    pub fn check(body: &MethodBody, cfg: &Cfg, frames: &Frames) -> IndexMap<usize, CallSiteVerdict> {
        let escaped = collect_escaped_kinds(body, frames);
        let mut verdicts = IndexMap::new();

        for (pc, insn) in body.insns.iter().enumerate() {
            let Some(frame) = frames[pc].as_ref() else {
                continue; // unreachable, never rewritten
            };
            let Insn::Invoke(mref) = insn else { continue };
            if intrinsics::classify(mref) != Some(CallKind::Next) {
                continue;
            }

            let verdict = judge_site(pc, body, cfg, frame, &escaped);
            debug!(pc, ?verdict, "next() call site");
            verdicts.insert(pc, verdict);
        }
        verdicts
    }
}

fn judge_site(
    pc: usize,
    body: &MethodBody,
    cfg: &Cfg,
    frame: &Frame,
    escaped: &HashSet<PrimitiveKind>,
) -> CallSiteVerdict {
    // Receiver of a zero-argument virtual call is the top of stack.
    let kind = match frame.top() {
        Some(AbstractValue::ProgressionIter(kind)) => kind,
        _ => return CallSiteVerdict::unsafe_because(None, UnsafeReason::ReceiverUnrefined),
    };
    if escaped.contains(&kind) {
        return CallSiteVerdict::unsafe_because(Some(kind), UnsafeReason::IteratorEscapes);
    }

    // The produced box must be consumed by the unbox call at the unique
    // fallthrough successor, and by nothing else.
    let Some(next_pc) = cfg.sole_fallthrough(pc, &body.insns) else {
        return CallSiteVerdict::unsafe_because(Some(kind), UnsafeReason::ResultNotUnboxed);
    };
    let Insn::Invoke(consumer) = &body.insns[next_pc] else {
        return CallSiteVerdict::unsafe_because(Some(kind), UnsafeReason::ResultNotUnboxed);
    };
    match intrinsics::classify(consumer) {
        Some(CallKind::Unbox(unbox_kind)) if unbox_kind == kind => {}
        Some(CallKind::Unbox(_)) => {
            return CallSiteVerdict::unsafe_because(Some(kind), UnsafeReason::KindMismatch)
        }
        _ => return CallSiteVerdict::unsafe_because(Some(kind), UnsafeReason::ResultNotUnboxed),
    }
    // Deleting the unbox is only sound if no other path reaches it; an
    // exception-handler entry pointing at it counts as another path.
    if cfg.predecessors(next_pc) != [pc] || !cfg.handler_predecessors(next_pc).is_empty() {
        return CallSiteVerdict::unsafe_because(Some(kind), UnsafeReason::UnboxShared);
    }

    CallSiteVerdict::safe(kind)
}

/// Kinds whose iterator identity escapes anywhere reachable in the method.
fn collect_escaped_kinds(body: &MethodBody, frames: &Frames) -> HashSet<PrimitiveKind> {
    let mut escaped = HashSet::new();

    for (pc, insn) in body.insns.iter().enumerate() {
        let Some(frame) = frames[pc].as_ref() else { continue };
        match insn {
            Insn::PutStatic(_) | Insn::ReturnValue => {
                record_iterator(frame.peek(0), &mut escaped);
            }
            Insn::IfRefEq(_) => {
                record_iterator(frame.peek(0), &mut escaped);
                record_iterator(frame.peek(1), &mut escaped);
            }
            Insn::Invoke(mref) => {
                record_call_escapes(mref, true, frame, &mut escaped);
            }
            Insn::InvokeStatic(mref) => {
                record_call_escapes(mref, false, frame, &mut escaped);
            }
            _ => {}
        }
    }
    escaped
}

/// Record iterator escapes caused by one call: any refined iterator in an
/// argument slot, or an iterator receiver used for anything other than the
/// recognized iteration methods.
fn record_call_escapes(
    mref: &MethodRef,
    virtual_call: bool,
    frame: &Frame,
    escaped: &mut HashSet<PrimitiveKind>,
) {
    let args = mref.arg_count();
    for depth in 0..args {
        record_iterator(frame.peek(depth), escaped);
    }
    if virtual_call {
        let receiver = frame.peek(args);
        let receiver_ok = matches!(
            intrinsics::classify(mref),
            Some(CallKind::Next) | Some(CallKind::HasNext) | Some(CallKind::SpecializedNext(_))
        );
        if !receiver_ok {
            record_iterator(receiver, escaped);
        }
    }
}

fn record_iterator(value: Option<AbstractValue>, escaped: &mut HashSet<PrimitiveKind>) {
    if let Some(AbstractValue::ProgressionIter(kind)) = value {
        escaped.insert(kind);
    }
}
