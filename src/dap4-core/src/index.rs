// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Row-major addressing over a fixed shape.
//!
//! Every array in the compiled model is stored flat. An `Index` pairs a
//! multi-dimensional position with the shape it addresses, which is enough
//! to recover the storage offset without a live cursor:
//!
//! ```text
//! offset = ((i0 * d1 + i1) * d2 + i2) ...
//! ```
//!
//! The outermost (first) dimension varies slowest.

use std::fmt;

use smallvec::SmallVec;

use crate::arg_err;
use crate::common::Result;

/// Coordinates for typical (rank <= 4) arrays stay inline.
pub type Coords = SmallVec<[usize; 4]>;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Index {
    indices: Coords,
    dimsizes: Coords,
}

impl Index {
    /// A zero-filled index of the given rank, over a zero-filled shape.
    pub fn new(rank: usize) -> Self {
        Index {
            indices: SmallVec::from_elem(0, rank),
            dimsizes: SmallVec::from_elem(0, rank),
        }
    }

    /// The single position of a scalar.
    pub fn scalar() -> Self {
        Index::new(0)
    }

    pub fn from_parts(indices: &[usize], dimsizes: &[usize]) -> Result<Self> {
        if indices.len() != dimsizes.len() {
            return arg_err!(
                InvalidArgument,
                format!(
                    "index rank {} does not match shape rank {}",
                    indices.len(),
                    dimsizes.len()
                )
            );
        }
        if checked_element_count(dimsizes).is_none() {
            return arg_err!(
                InvalidArgument,
                format!("shape {dimsizes:?} addresses more than usize::MAX elements")
            );
        }
        Ok(Index {
            indices: SmallVec::from_slice(indices),
            dimsizes: SmallVec::from_slice(dimsizes),
        })
    }

    pub fn rank(&self) -> usize {
        self.dimsizes.len()
    }

    pub fn get(&self, i: usize) -> Result<usize> {
        match self.indices.get(i) {
            Some(&idx) => Ok(idx),
            None => arg_err!(
                InvalidArgument,
                format!("dimension {} out of range for rank {}", i, self.rank())
            ),
        }
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn dimsizes(&self) -> &[usize] {
        &self.dimsizes
    }

    /// True when every coordinate lies inside its dimension.
    pub fn in_bounds(&self) -> bool {
        self.indices
            .iter()
            .zip(self.dimsizes.iter())
            .all(|(i, d)| i < d)
    }

    /// Linear storage offset of the current position. Only meaningful
    /// when `in_bounds()`; out-of-bounds positions saturate rather than
    /// wrap.
    pub fn linear_offset(&self) -> usize {
        let mut offset: usize = 0;
        for (idx, size) in self.indices.iter().zip(self.dimsizes.iter()) {
            offset = offset.saturating_mul(*size).saturating_add(*idx);
        }
        offset
    }

    /// Given a linear offset and a shape, compute the position it names.
    pub fn offset_to_index(offset: usize, dimsizes: &[usize]) -> Result<Self> {
        // offset = d3*(d2*(d1*(x1))+x2)+x3
        let mut indices: Coords = SmallVec::from_elem(0, dimsizes.len());
        let mut offset = offset;
        for i in (0..dimsizes.len()).rev() {
            let size = dimsizes[i];
            if size == 0 {
                return arg_err!(
                    InvalidArgument,
                    format!("dimension {i} has size 0; no offset addresses it")
                );
            }
            indices[i] = offset % size;
            offset = (offset - indices[i]) / size;
        }
        Ok(Index {
            indices,
            dimsizes: SmallVec::from_slice(dimsizes),
        })
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[")?;
        for (i, (idx, size)) in self.indices.iter().zip(self.dimsizes.iter()).enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{idx}/{size}")?;
        }
        write!(f, "]({})", self.linear_offset())
    }
}

/// Number of elements addressed by a shape; 1 for a scalar. Saturates
/// at `usize::MAX`; use `checked_element_count` where an oversized shape
/// must be rejected.
pub fn element_count(dimsizes: &[usize]) -> usize {
    checked_element_count(dimsizes).unwrap_or(usize::MAX)
}

/// Number of elements addressed by a shape, or None if it overflows.
pub fn checked_element_count(dimsizes: &[usize]) -> Option<usize> {
    // a zero dimension empties the shape no matter what follows it
    if dimsizes.contains(&0) {
        return Some(0);
    }
    dimsizes
        .iter()
        .try_fold(1usize, |count, size| count.checked_mul(*size))
}

/// Walks every position of a shape in row-major order, advancing by
/// carry rather than dividing, so the n-th item has `linear_offset() == n`.
pub struct Odometer {
    next: Option<Index>,
    remaining: usize,
}

impl Odometer {
    pub fn new(dimsizes: &[usize]) -> Self {
        let remaining = element_count(dimsizes);
        let next = if remaining == 0 {
            None
        } else {
            Some(Index {
                indices: SmallVec::from_elem(0, dimsizes.len()),
                dimsizes: SmallVec::from_slice(dimsizes),
            })
        };
        Odometer { next, remaining }
    }
}

impl Iterator for Odometer {
    type Item = Index;

    fn next(&mut self) -> Option<Index> {
        let curr = self.next.take()?;
        self.remaining -= 1;

        let mut succ = curr.clone();
        for i in (0..succ.rank()).rev() {
            succ.indices[i] += 1;
            if succ.indices[i] < succ.dimsizes[i] {
                self.next = Some(succ);
                return Some(curr);
            }
            succ.indices[i] = 0;
        }

        // carried out of the outermost dimension: curr was the last position
        Some(curr)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Odometer {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{ErrorCode, ErrorKind};

    #[test]
    fn test_scalar() {
        let idx = Index::scalar();
        assert_eq!(0, idx.rank());
        assert_eq!(0, idx.linear_offset());

        let idx = Index::offset_to_index(0, &[]).unwrap();
        assert_eq!(Index::new(0), idx);
        assert_eq!("[](0)", format!("{idx}"));
    }

    #[test]
    fn test_zero_filled() {
        let idx = Index::new(3);
        assert_eq!(3, idx.rank());
        assert_eq!(&[0, 0, 0], idx.indices());
        assert_eq!(&[0, 0, 0], idx.dimsizes());
        assert_eq!(0, idx.linear_offset());
    }

    #[test]
    fn test_from_parts_rank_mismatch() {
        let err = Index::from_parts(&[1, 2], &[3]).unwrap_err();
        assert_eq!(ErrorKind::Argument, err.kind);
        assert_eq!(ErrorCode::InvalidArgument, err.code);
    }

    #[test]
    fn test_copy_is_independent() {
        let a = Index::from_parts(&[1, 2], &[3, 4]).unwrap();
        let mut b = a.clone();
        b.indices[0] = 2;
        assert_eq!(1, a.get(0).unwrap());
        assert_eq!(2, b.get(0).unwrap());
    }

    #[test]
    fn test_get_bounds() {
        let idx = Index::from_parts(&[1, 2], &[3, 4]).unwrap();
        assert_eq!(1, idx.get(0).unwrap());
        assert_eq!(2, idx.get(1).unwrap());
        for i in [2, 3, usize::MAX] {
            let err = idx.get(i).unwrap_err();
            assert_eq!(ErrorCode::InvalidArgument, err.code);
        }
        assert!(Index::scalar().get(0).is_err());
    }

    #[test]
    fn test_linear_offset() {
        let cases: &[(&[usize], &[usize], usize)] = &[
            (&[1, 1], &[2, 3], 4),
            (&[0, 0], &[2, 3], 0),
            (&[1, 2], &[2, 3], 5),
            (&[1, 2, 3], &[2, 3, 4], 23),
            (&[4], &[5], 4),
        ];
        for (indices, dimsizes, expected) in cases {
            let idx = Index::from_parts(indices, dimsizes).unwrap();
            assert_eq!(*expected, idx.linear_offset(), "{idx}");
        }
    }

    #[test]
    fn test_offset_to_index() {
        let idx = Index::offset_to_index(4, &[2, 3]).unwrap();
        assert_eq!(&[1, 1], idx.indices());
        assert_eq!(4, idx.linear_offset());
        assert_eq!("[1/2,1/3](4)", format!("{idx}"));

        let idx = Index::offset_to_index(23, &[2, 3, 4]).unwrap();
        assert_eq!(&[1, 2, 3], idx.indices());
    }

    #[test]
    fn test_offset_to_index_zero_dim() {
        let err = Index::offset_to_index(0, &[2, 0, 3]).unwrap_err();
        assert_eq!(ErrorCode::InvalidArgument, err.code);
    }

    #[test]
    fn test_in_bounds() {
        assert!(Index::from_parts(&[1, 2], &[2, 3]).unwrap().in_bounds());
        assert!(!Index::from_parts(&[2, 0], &[2, 3]).unwrap().in_bounds());
        assert!(Index::scalar().in_bounds());
    }

    #[test]
    fn test_element_count() {
        assert_eq!(1, element_count(&[]));
        assert_eq!(6, element_count(&[2, 3]));
        assert_eq!(0, element_count(&[2, 0, 3]));
    }

    #[test]
    fn test_oversized_shapes() {
        assert_eq!(None, checked_element_count(&[usize::MAX, 2]));
        assert_eq!(Some(0), checked_element_count(&[usize::MAX, 2, 0]));
        assert_eq!(usize::MAX, element_count(&[usize::MAX, 2]));

        let err = Index::from_parts(&[0, 0], &[usize::MAX, 2]).unwrap_err();
        assert_eq!(ErrorCode::InvalidArgument, err.code);

        let mut odometer = Odometer::new(&[usize::MAX, 2]);
        assert_eq!(Some(0), odometer.next().map(|idx| idx.linear_offset()));
        assert_eq!(Some(1), odometer.next().map(|idx| idx.linear_offset()));
    }

    #[test]
    fn test_odometer() {
        let cases: &[(&[usize], Vec<Vec<usize>>)] = &[
            (&[0], vec![]),
            (&[0, 0], vec![]),
            (&[], vec![vec![]]),
            (&[3], vec![vec![0], vec![1], vec![2]]),
            (
                &[3, 2],
                vec![
                    vec![0, 0],
                    vec![0, 1],
                    vec![1, 0],
                    vec![1, 1],
                    vec![2, 0],
                    vec![2, 1],
                ],
            ),
            (
                &[3, 1, 2],
                vec![
                    vec![0, 0, 0],
                    vec![0, 0, 1],
                    vec![1, 0, 0],
                    vec![1, 0, 1],
                    vec![2, 0, 0],
                    vec![2, 0, 1],
                ],
            ),
        ];

        for (shape, expected) in cases {
            let odometer = Odometer::new(shape);
            assert_eq!(expected.len(), odometer.len());
            let mut n = 0;
            for (i, idx) in odometer.enumerate() {
                assert_eq!(expected[i].as_slice(), idx.indices());
                assert_eq!(i, idx.linear_offset());
                n += 1;
            }
            assert_eq!(expected.len(), n);
        }
    }

    mod properties {
        use proptest::prelude::*;

        use super::super::*;

        fn shape_strategy() -> impl Strategy<Value = Vec<usize>> {
            prop::collection::vec(1usize..6, 0..5)
        }

        proptest! {
            #[test]
            fn offset_roundtrip((shape, offset) in shape_strategy().prop_flat_map(|shape| {
                let n = element_count(&shape);
                (Just(shape), 0..n)
            })) {
                let idx = Index::offset_to_index(offset, &shape).unwrap();
                prop_assert_eq!(shape.len(), idx.rank());
                prop_assert!(idx.in_bounds());
                prop_assert_eq!(offset, idx.linear_offset());
            }

            #[test]
            fn odometer_agrees_with_offset_to_index(shape in shape_strategy()) {
                for (n, idx) in Odometer::new(&shape).enumerate() {
                    prop_assert_eq!(Index::offset_to_index(n, &shape).unwrap(), idx);
                }
            }
        }
    }
}
