// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use float_cmp::approx_eq;
use proptest::prelude::*;

use dap4_engine::test_common::{
    TestDataset, array, compile, float64s, instance, int32s, records,
};
use dap4_engine::{
    AtomicType, CompilerConfig, DataFactory, DimRef, Dsp, ErrorCode, ErrorKind, Index, MemoryDsp,
    ModelCompiler, Odometer, Slice, TargetArray,
};

/// A 2x2 array of structures whose member `x` holds `i*2 + j`.
fn grid() -> MemoryDsp {
    let mut ds = TestDataset::new("grid");
    let root = ds.root();
    let s = ds
        .schema()
        .structure(root, "s", &[DimRef::Anonymous(2), DimRef::Anonymous(2)])
        .unwrap();
    ds.schema().atomic(s, "x", AtomicType::Int32, &[]).unwrap();
    let elements = Odometer::new(&[2, 2])
        .map(|idx| {
            let (i, j) = (idx.indices()[0] as i32, idx.indices()[1] as i32);
            instance(vec![int32s([i * 2 + j])])
        })
        .collect();
    ds.data(s, array(elements));
    ds.build()
}

#[test]
fn structure_array_addressing() {
    let compiled = compile(&grid());
    let s = compiled.array("/s").unwrap().as_structure().unwrap();
    assert_eq!(&[2, 2], s.shape());

    let idx = Index::from_parts(&[1, 1], &[2, 2]).unwrap();
    let element = s.element_at(&idx).unwrap();
    let x = element.field(0).unwrap().as_atomic().unwrap();
    assert_eq!(Some(3), x.get(&Index::scalar()).unwrap().as_i64());

    let origin = Index::from_parts(&[0, 0], &[2, 2]).unwrap();
    let x = s.member_at(&origin, "x").unwrap().as_atomic().unwrap();
    assert_eq!(Some(0), x.get_offset(0).unwrap().as_i64());

    for idx in Odometer::new(&[2, 2]) {
        let expected = (idx.indices()[0] * 2 + idx.indices()[1]) as i64;
        let x = s.member(idx.linear_offset(), "x").unwrap();
        assert_eq!(
            Some(expected),
            x.as_atomic().unwrap().get_offset(0).unwrap().as_i64()
        );
    }

    let out = Index::from_parts(&[2, 0], &[2, 2]).unwrap();
    assert_eq!(ErrorCode::IndexOutOfRange, s.element_at(&out).unwrap_err().code);
}

fn sequence_of(rows: usize) -> MemoryDsp {
    let mut ds = TestDataset::new("seq");
    let root = ds.root();
    let q = ds.schema().sequence(root, "q", &[]).unwrap();
    ds.schema().atomic(q, "v", AtomicType::Int32, &[]).unwrap();
    ds.schema().atomic(q, "w", AtomicType::Float64, &[]).unwrap();
    let rows = (0..rows)
        .map(|r| instance(vec![int32s([r as i32]), float64s([r as f64 / 4.0])]))
        .collect();
    ds.data(q, array(vec![records(rows)]));
    ds.build()
}

#[test]
fn sequence_records() {
    let compiled = compile(&sequence_of(5));
    let q = compiled.array("/q").unwrap().as_sequence().unwrap();
    assert!(q.shape().is_empty());
    let seq = q.element(0).unwrap();
    assert_eq!(5, seq.len());

    for row in 0..5 {
        let v = q.member(0, row, "v").unwrap().as_atomic().unwrap();
        assert_eq!(Some(row as i64), v.get_offset(0).unwrap().as_i64());
        let w = q.member(0, row, "w").unwrap().as_atomic().unwrap();
        assert!(approx_eq!(
            f64,
            row as f64 / 4.0,
            w.get_offset(0).unwrap().as_f64().unwrap(),
            ulps = 2
        ));
    }

    let err = seq.record(5).unwrap_err();
    assert_eq!(ErrorKind::Data, err.kind);
    assert_eq!(ErrorCode::IndexOutOfRange, err.code);
    assert_eq!(ErrorCode::IndexOutOfRange, q.member(0, 5, "v").unwrap_err().code);
}

#[test]
fn empty_sequence() {
    let compiled = compile(&sequence_of(0));
    let q = compiled.array("/q").unwrap().as_sequence().unwrap();
    assert!(q.element(0).unwrap().is_empty());
    assert!(q.element(0).unwrap().record(0).is_err());
}

#[test]
fn record_count_hint_is_optional() {
    let dsp = sequence_of(3).with_count_hints(false);
    let with_hints = compile(&sequence_of(3));
    let mut compiler = ModelCompiler::with_config(
        &dsp,
        CompilerConfig::default().with_preallocate_records(true),
    );
    compiler.compile().unwrap();
    assert_eq!(with_hints, compiler.into_compiled().unwrap());
}

#[test]
fn data_tree_sequence_bounds() {
    let dsp = sequence_of(2);
    let mut tree = dsp.data_dataset().unwrap();
    let array = tree.dataset().unwrap().variables[0];
    let seq = tree.element(array, 0).unwrap();
    assert_eq!(
        2,
        tree.enumerate_records(&dsp, &DataFactory, seq, false)
            .unwrap()
    );
    assert!(tree.record(seq, 1).is_ok());
    assert_eq!(ErrorCode::IndexOutOfRange, tree.record(seq, 2).unwrap_err().code);
}

#[test]
fn array_of_sequences() {
    let mut ds = TestDataset::new("ragged");
    let root = ds.root();
    let q = ds
        .schema()
        .sequence(root, "q", &[DimRef::Anonymous(3)])
        .unwrap();
    ds.schema().atomic(q, "v", AtomicType::Int32, &[]).unwrap();
    let row = |v: i32| instance(vec![int32s([v])]);
    ds.data(
        q,
        array(vec![
            records(vec![row(1), row(2)]),
            records(vec![]),
            records(vec![row(3), row(4), row(5)]),
        ]),
    );
    let compiled = compile(&ds.build());

    let q = compiled.array("/q").unwrap().as_sequence().unwrap();
    assert_eq!(3, q.len());
    let lens: Vec<usize> = (0..3).map(|i| q.element(i).unwrap().len()).collect();
    assert_eq!(vec![2, 0, 3], lens);

    let idx = Index::from_parts(&[2], &[3]).unwrap();
    let third = q.element_at(&idx).unwrap();
    let v = third.record(2).unwrap().field(0).unwrap().as_atomic().unwrap();
    assert_eq!(Some(5), v.get_offset(0).unwrap().as_i64());
}

#[test]
fn nested_compounds() {
    // a structure array whose instances each hold an atomic vector and a
    // sequence of structures
    let mut ds = TestDataset::new("nested");
    let root = ds.root();
    let s = ds.schema().structure(root, "s", &[DimRef::Anonymous(2)]).unwrap();
    ds.schema()
        .atomic(s, "vec", AtomicType::Int32, &[DimRef::Anonymous(3)])
        .unwrap();
    let q = ds.schema().sequence(s, "q", &[]).unwrap();
    let inner = ds.schema().structure(q, "p", &[]).unwrap();
    ds.schema().atomic(inner, "z", AtomicType::Int32, &[]).unwrap();

    let point = |z: i32| array(vec![instance(vec![int32s([z])])]);
    ds.data(
        s,
        array(vec![
            instance(vec![
                int32s([1, 2, 3]),
                array(vec![records(vec![instance(vec![point(10)])])]),
            ]),
            instance(vec![
                int32s([4, 5, 6]),
                array(vec![records(vec![
                    instance(vec![point(20)]),
                    instance(vec![point(21)]),
                ])]),
            ]),
        ]),
    );
    let dsp = ds.build();
    let compiled = compile(&dsp);

    let s = compiled.array("/s").unwrap().as_structure().unwrap();
    let vec1 = s.member(1, "vec").unwrap().as_atomic().unwrap();
    assert_eq!(&[3], vec1.shape());
    assert_eq!(Some(6), vec1.get_offset(2).unwrap().as_i64());

    let q = s.member(1, "q").unwrap().as_sequence().unwrap();
    assert_eq!(2, q.element(0).unwrap().len());
    let p = q.member(0, 1, "p").unwrap().as_structure().unwrap();
    let z = p.member(0, "z").unwrap().as_atomic().unwrap();
    assert_eq!(Some(21), z.get_offset(0).unwrap().as_i64());

    // the member fqns were compiled too
    assert!(compiled.target.find("/s.q.p.z").is_some());
}

#[test]
fn atomic_offsets_follow_row_major_order() {
    let mut ds = TestDataset::new("cube");
    let root = ds.root();
    let shape = [2usize, 3, 4];
    let a = ds
        .schema()
        .atomic(
            root,
            "a",
            AtomicType::Int32,
            &shape.map(DimRef::Anonymous),
        )
        .unwrap();
    ds.data(a, int32s(0..24));
    let compiled = compile(&ds.build());
    let a = compiled.array("/a").unwrap().as_atomic().unwrap();

    for idx in Odometer::new(&shape) {
        let back = Index::offset_to_index(idx.linear_offset(), &shape).unwrap();
        assert_eq!(idx, back);
        assert_eq!(
            Some(idx.linear_offset() as i64),
            a.get(&idx).unwrap().as_i64()
        );
    }
    assert_eq!(4, a.dimension(2).unwrap());
    assert_eq!(3, compiled.array("/a").unwrap().rank());
}

#[test]
fn section_and_squeeze_compiled_arrays() {
    let mut ds = TestDataset::new("slices");
    let root = ds.root();
    let a = ds
        .schema()
        .atomic(
            root,
            "a",
            AtomicType::Int32,
            &[DimRef::Anonymous(1), DimRef::Anonymous(10)],
        )
        .unwrap();
    ds.data(a, int32s(1..=10));
    let compiled = compile(&ds.build());

    let TargetArray::Atomic(a) = compiled.array("/a").unwrap() else {
        panic!("expected an atomic array");
    };
    let squeezed = a.squeeze();
    assert_eq!(&[10], squeezed.shape());

    let section = squeezed.section(&[Slice::new(3, 2, 7)]).unwrap();
    let values: Vec<i64> = section
        .values()
        .iter()
        .map(|v| v.as_i64().unwrap())
        .collect();
    assert_eq!(vec![4, 6, 8], values);

    let section = a.section(&[Slice::all(1), Slice::new(0, 3, 9)]).unwrap();
    assert_eq!(&[1, 4], section.shape());
}

fn shape_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1usize..5, 0..4)
}

proptest! {
    #[test]
    fn compiled_atomic_matches_offsets(shape in shape_strategy()) {
        let mut ds = TestDataset::new("prop");
        let root = ds.root();
        let dims: Vec<DimRef> = shape.iter().map(|d| DimRef::Anonymous(*d)).collect();
        let a = ds.schema().atomic(root, "a", AtomicType::Int32, &dims).unwrap();
        let n = shape.iter().product::<usize>() as i32;
        ds.data(a, int32s(0..n));
        let compiled = compile(&ds.build());
        let a = compiled.array("/a").unwrap().as_atomic().unwrap();

        prop_assert_eq!(shape.as_slice(), a.shape());
        for idx in Odometer::new(&shape) {
            let expected = idx.linear_offset() as i64;
            prop_assert_eq!(Some(expected), a.get(&idx).unwrap().as_i64());
        }
    }
}
