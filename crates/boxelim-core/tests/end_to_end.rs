//! End-to-end tests: analyze, rewrite and execute whole loop bodies,
//! comparing the rewritten stream's observable behavior with the original.

use boxelim_bytecode::intrinsics::refs;
use boxelim_bytecode::{
    BinaryOp, Evaluator, FieldRef, Insn, MethodBody, PrimitiveKind, Value,
};
use boxelim_core::{analyze, optimize_body, UnsafeReason};

/// `sum = 0; for (v in first..last step step) sum += v; return sum`
///
/// Locals: 0 = iterator, 1 = sum.
fn sum_loop(first: i64, last: i64, step: Option<i64>) -> MethodBody {
    let mut insns = vec![Insn::Const(0), Insn::Store(1), Insn::Const(first), Insn::Const(last)];
    if let Some(s) = step {
        insns.push(Insn::Const(s));
        insns.push(Insn::InvokeStatic(refs::make_range_with_step(PrimitiveKind::Int)));
    } else {
        insns.push(Insn::InvokeStatic(refs::make_range(PrimitiveKind::Int)));
    }
    let header = insns.len() + 2;
    insns.extend([
        Insn::Invoke(refs::range_iterator(PrimitiveKind::Int)),
        Insn::Store(0),
        // header:
        Insn::Load(0),
        Insn::Invoke(refs::iterator_has_next()),
        Insn::IfZero(header + 10),
        Insn::Load(1),
        Insn::Load(0),
        Insn::Invoke(refs::iterator_next()),
        Insn::Invoke(refs::unbox_value(PrimitiveKind::Int)),
        Insn::Binary(BinaryOp::Add),
        Insn::Store(1),
        Insn::Goto(header),
        // exit:
        Insn::Load(1),
        Insn::ReturnValue,
    ]);
    MethodBody::new(insns, 2)
}

fn run(body: &MethodBody) -> (Option<Value>, usize) {
    let result = Evaluator::new().run(body).expect("evaluation failed");
    (result.return_value, result.statics.len())
}

#[test]
fn scenario_a_sum_loop_is_rewritten_and_equivalent() {
    let mut body = sum_loop(0, 9, None);
    let original = body.clone();

    let outcome = optimize_body(&mut body).unwrap();
    assert_eq!(outcome.candidate_sites, 1);
    assert_eq!(outcome.rewritten_sites, 1);

    // The generic call became the integer-specialized retrieval and the
    // unbox call disappeared.
    assert!(body
        .insns
        .iter()
        .any(|i| matches!(i, Insn::Invoke(m) if m.name == "nextInt" && m.desc == "()I")));
    assert!(!body
        .insns
        .iter()
        .any(|i| matches!(i, Insn::Invoke(m) if m.name == "intValue")));
    assert_eq!(body.len(), original.len() - 1);

    assert_eq!(run(&original).0, Some(Value::Int(45)));
    assert_eq!(run(&body).0, Some(Value::Int(45)));
}

#[test]
fn scenario_b_iterator_stored_to_field_is_not_rewritten() {
    // Same loop, but the iterator reference is published to a static field
    // before the loop starts.
    let base = sum_loop(0, 9, None);
    let field = FieldRef::new("x/State", "iter", "Llang/collections/IntIterator;");
    let mut insns = base.insns.clone();
    // After `Store 0` (index 6): Load 0 / PutStatic, shifting the rest by 2.
    insns.splice(7..7, [Insn::Load(0), Insn::PutStatic(field)]);
    for insn in insns.iter_mut() {
        insn.map_target(|t| if t >= 7 { t + 2 } else { t });
    }
    let mut body = MethodBody::new(insns, 2);
    let original = body.clone();

    let result = analyze(&body).unwrap();
    let (_, verdict) = result.verdicts.first().expect("one next() site");
    assert!(!verdict.safe);
    assert_eq!(verdict.reason, Some(UnsafeReason::IteratorEscapes));

    let outcome = optimize_body(&mut body).unwrap();
    assert_eq!(outcome.rewritten_sites, 0);
    assert_eq!(body, original);

    // Still executes to the same sum, box and all.
    assert_eq!(run(&body).0, Some(Value::Int(45)));
}

#[test]
fn scenario_c_conflicting_join_disables_rewrite() {
    // Local 0 holds an iterator on one path and an unrelated value on the
    // other; the next() call after the join must see Conflict.
    //  0: Const 1
    //  1: IfZero 9
    //  2: Const 0
    //  3: Const 9
    //  4: of
    //  5: iterator
    //  6: Store 0
    //  7: Nop
    //  8: Goto 11
    //  9: Const 7
    // 10: Store 0
    // 11: Load 0 / next / unbox / return
    let body = MethodBody::new(
        vec![
            Insn::Const(1),
            Insn::IfZero(9),
            Insn::Const(0),
            Insn::Const(9),
            Insn::InvokeStatic(refs::make_range(PrimitiveKind::Int)),
            Insn::Invoke(refs::range_iterator(PrimitiveKind::Int)),
            Insn::Store(0),
            Insn::Nop,
            Insn::Goto(11),
            Insn::Const(7),
            Insn::Store(0),
            Insn::Load(0),
            Insn::Invoke(refs::iterator_next()),
            Insn::Invoke(refs::unbox_value(PrimitiveKind::Int)),
            Insn::ReturnValue,
        ],
        1,
    );

    let result = analyze(&body).unwrap();
    let verdict = result.verdicts[&12];
    assert!(!verdict.safe);
    assert_eq!(verdict.reason, Some(UnsafeReason::ReceiverUnrefined));
    assert_eq!(result.safe_sites().count(), 0);
}

#[test]
fn rewrite_transparency_over_progression_shapes() {
    // (first, last, step, expected sum)
    let cases = [
        (5, 4, None, 0),            // empty progression
        (3, 3, None, 3),            // single element
        (0, 9, None, 45),           // multi element
        (9, 0, Some(-1), 45),       // reversed step
        (0, 9, Some(3), 18),        // strided: 0 + 3 + 6 + 9
    ];

    for (first, last, step, expected) in cases {
        let original = sum_loop(first, last, step);
        let mut rewritten = original.clone();
        let outcome = optimize_body(&mut rewritten).unwrap();
        assert_eq!(outcome.rewritten_sites, 1, "case {first}..{last}");

        let got_original = Evaluator::new().run(&original).unwrap();
        let got_rewritten = Evaluator::new().run(&rewritten).unwrap();
        assert_eq!(got_original.return_value, Some(Value::Int(expected)));
        assert_eq!(got_original.return_value, got_rewritten.return_value);
        assert_eq!(got_original.statics, got_rewritten.statics);
    }
}

#[test]
fn long_and_char_kinds_specialize_too() {
    for kind in [PrimitiveKind::Long, PrimitiveKind::Char] {
        let mut body = MethodBody::new(
            vec![
                Insn::Const(1),
                Insn::Const(3),
                Insn::InvokeStatic(refs::make_range(kind)),
                Insn::Invoke(refs::range_iterator(kind)),
                Insn::Invoke(refs::iterator_next()),
                Insn::Invoke(refs::unbox_value(kind)),
                Insn::ReturnValue,
            ],
            0,
        );
        let outcome = optimize_body(&mut body).unwrap();
        assert_eq!(outcome.rewritten_sites, 1);
        let expected_name = format!("next{}", kind.type_name());
        assert!(body
            .insns
            .iter()
            .any(|i| matches!(i, Insn::Invoke(m) if m.name == expected_name)));
        assert_eq!(run(&body).0, Some(Value::Int(1)));
    }
}
