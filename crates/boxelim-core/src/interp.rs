//! Per-instruction transfer function.
//!
//! Maps the frame before an instruction to the frame after it, using the
//! abstract value lattice. Only the *shape* of the computation is simulated:
//! stack depth, local slot identity, and propagation of refined values when
//! they are merely moved. Arithmetic results and unknown call results are
//! plain `Reference`.

use boxelim_bytecode::{intrinsics, CallKind, Insn, MethodRef};

use crate::error::AnalysisError;
use crate::frame::Frame;
use crate::primitives;
use crate::value::AbstractValue;

/// Guard against runaway stack growth in malformed bodies; well-formed
/// frames must converge long before this.
const MAX_STACK: usize = 1024;

/// Apply `insn` at `pc` to `frame`, producing the successor frame.
///
/// A type-incoherent instruction (underflow, bad local slot) is a fatal
/// internal-consistency error for this method's analysis.
pub fn step(pc: usize, insn: &Insn, frame: &Frame) -> Result<Frame, AnalysisError> {
    let mut out = frame.clone();
    match insn {
        Insn::Const(_) => out.push(AbstractValue::Reference),
        Insn::Load(slot) => {
            let v = out.local(pc, *slot)?;
            out.push(v);
        }
        Insn::Store(slot) => {
            let v = out.pop(pc)?;
            out.set_local(pc, *slot, v)?;
        }
        Insn::Dup => {
            let v = out.top().ok_or(AnalysisError::StackUnderflow { pc })?;
            out.push(v);
        }
        Insn::Pop => {
            out.pop(pc)?;
        }
        Insn::Binary(_) => {
            out.pop(pc)?;
            out.pop(pc)?;
            out.push(AbstractValue::Reference);
        }
        Insn::Goto(_) | Insn::Nop | Insn::Return => {}
        Insn::IfZero(_) => {
            out.pop(pc)?;
        }
        Insn::IfRefEq(_) => {
            out.pop(pc)?;
            out.pop(pc)?;
        }
        Insn::GetStatic(_) => out.push(AbstractValue::Reference),
        Insn::PutStatic(_) => {
            out.pop(pc)?;
        }
        Insn::ReturnValue => {
            out.pop(pc)?;
        }
        Insn::Invoke(mref) => step_invoke(pc, mref, true, &mut out)?,
        Insn::InvokeStatic(mref) => step_invoke(pc, mref, false, &mut out)?,
    }
    if out.stack.len() > MAX_STACK {
        return Err(AnalysisError::StackOverflow { pc, limit: MAX_STACK });
    }
    Ok(out)
}

fn step_invoke(pc: usize, mref: &MethodRef, virtual_call: bool, out: &mut Frame) -> Result<(), AnalysisError> {
    match intrinsics::classify(mref) {
        Some(CallKind::IteratorOf(kind)) if virtual_call => {
            out.pop(pc)?;
            // Kinds outside the table fall back to a plain reference.
            if primitives::supports_progression(kind) {
                out.push(AbstractValue::ProgressionIter(kind));
            } else {
                out.push(AbstractValue::Reference);
            }
        }
        Some(CallKind::Next) if virtual_call => {
            let receiver = out.pop(pc)?;
            match receiver {
                AbstractValue::ProgressionIter(kind) => out.push(AbstractValue::Boxed(kind)),
                _ => out.push(AbstractValue::Reference),
            }
        }
        Some(CallKind::Box(kind)) if !virtual_call => {
            out.pop(pc)?;
            out.push(AbstractValue::Boxed(kind));
        }
        Some(CallKind::Unbox(_)) | Some(CallKind::SpecializedNext(_)) | Some(CallKind::HasNext)
            if virtual_call =>
        {
            out.pop(pc)?;
            out.push(AbstractValue::Reference);
        }
        // Unrecognized calls, and recognized names invoked through the
        // wrong call shape: plain stack bookkeeping from the descriptor.
        _ => {
            for _ in 0..mref.arg_count() {
                out.pop(pc)?;
            }
            if virtual_call {
                out.pop(pc)?;
            }
            if mref.returns_value() {
                out.push(AbstractValue::Reference);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxelim_bytecode::intrinsics::refs;
    use boxelim_bytecode::PrimitiveKind;
    use AbstractValue::*;

    fn frame_with_stack(values: &[AbstractValue]) -> Frame {
        let mut frame = Frame::entry(4);
        for &v in values {
            frame.push(v);
        }
        frame
    }

    #[test]
    fn test_iterator_call_refines() {
        let frame = frame_with_stack(&[Reference]);
        let insn = Insn::Invoke(refs::range_iterator(PrimitiveKind::Int));
        let out = step(0, &insn, &frame).unwrap();
        assert_eq!(out.top(), Some(ProgressionIter(PrimitiveKind::Int)));
    }

    #[test]
    fn test_next_on_iterator_yields_boxed() {
        let frame = frame_with_stack(&[ProgressionIter(PrimitiveKind::Long)]);
        let out = step(0, &Insn::Invoke(refs::iterator_next()), &frame).unwrap();
        assert_eq!(out.top(), Some(Boxed(PrimitiveKind::Long)));
    }

    #[test]
    fn test_next_on_unrefined_receiver_yields_reference() {
        let frame = frame_with_stack(&[Conflict]);
        let out = step(0, &Insn::Invoke(refs::iterator_next()), &frame).unwrap();
        assert_eq!(out.top(), Some(Reference));
    }

    #[test]
    fn test_boxing_refines() {
        let frame = frame_with_stack(&[Reference]);
        let insn = Insn::InvokeStatic(refs::box_value(PrimitiveKind::Char));
        let out = step(0, &insn, &frame).unwrap();
        assert_eq!(out.top(), Some(Boxed(PrimitiveKind::Char)));
    }

    #[test]
    fn test_moves_propagate_refined_values() {
        let frame = frame_with_stack(&[ProgressionIter(PrimitiveKind::Int)]);
        let stored = step(0, &Insn::Store(2), &frame).unwrap();
        assert_eq!(stored.locals[2], ProgressionIter(PrimitiveKind::Int));
        let loaded = step(1, &Insn::Load(2), &stored).unwrap();
        assert_eq!(loaded.top(), Some(ProgressionIter(PrimitiveKind::Int)));

        let duped = step(2, &Insn::Dup, &loaded).unwrap();
        assert_eq!(duped.peek(0), duped.peek(1));
    }

    #[test]
    fn test_unknown_call_pops_by_descriptor() {
        let frame = frame_with_stack(&[Reference, Reference, Boxed(PrimitiveKind::Int)]);
        let sink = MethodRef::new("x/Sink", "consume", "(Ljava/lang/Object;I)I");
        let out = step(0, &Insn::Invoke(sink), &frame).unwrap();
        // receiver + 2 args popped, one result pushed
        assert_eq!(out.stack.len(), 1);
        assert_eq!(out.top(), Some(Reference));
    }

    #[test]
    fn test_underflow_is_fatal() {
        let frame = Frame::entry(0);
        assert_eq!(
            step(3, &Insn::Pop, &frame),
            Err(AnalysisError::StackUnderflow { pc: 3 })
        );
    }

    #[test]
    fn test_bad_local_is_fatal() {
        let frame = frame_with_stack(&[Reference]);
        assert!(matches!(
            step(0, &Insn::Store(9), &frame),
            Err(AnalysisError::BadLocal { pc: 0, slot: 9, .. })
        ));
    }
}
