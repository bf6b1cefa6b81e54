//! Tensor alignment.
//!
//! A pvariable is stored with its declared parameter order, but expressions
//! use it with permuted, repeated or missing parameters. Alignment plans the
//! reshape that presents the stored array under the signature an expression
//! expects:
//!
//! 1. drop literal-bound positions (handled by [`crate::slicing`]),
//! 2. match each output axis to the input axis with the same label, or
//!    broadcast a new trailing axis sized by the output type,
//! 3. contract over repeated labels, transpose, or leave the array as is.
//!
//! Plans are keyed structurally by [`TransformKey`] and memoized in a
//! [`TransformCache`] shared by every caller of the engine.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use rddl_foundation::{PVarId, Tensor, TypeId, VarLabel};

use crate::error::{GroundingError, Result};
use crate::signature::Signature;
use crate::universe::ObjectUniverse;

/// Axis operation applied after broadcasting.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TransformOp {
    Identity,
    /// Output axis `k` is input axis `axes[k]`.
    Transpose { axes: Vec<usize> },
    /// Input axis `i` is read from output axis `labels[i]`; repeated labels
    /// read along a diagonal.
    Contract { labels: Vec<usize>, out_rank: usize },
}

impl fmt::Display for TransformOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformOp::Identity => f.write_str("identity"),
            TransformOp::Transpose { axes } => write!(f, "transpose{:?}", axes),
            TransformOp::Contract { labels, out_rank } => {
                write!(f, "contract{:?}->{}", labels, out_rank)
            }
        }
    }
}

/// Structural identity of a transform.
///
/// Two alignment requests with equal keys produce the same function
/// regardless of which pvariable or labels they came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransformKey {
    /// Positions of the broadcast axes in the expanded array.
    pub new_axes: Vec<usize>,
    /// Shape after broadcasting: input shape followed by the new dimensions.
    pub out_shape: Vec<usize>,
    pub op: TransformOp,
}

impl TransformKey {
    fn in_rank(&self) -> usize {
        self.out_shape.len() - self.new_axes.len()
    }
}

/// An immutable, memoized alignment function.
#[derive(Debug, PartialEq, Eq)]
pub struct Transform {
    key: TransformKey,
}

impl Transform {
    pub fn new(key: TransformKey) -> Self {
        Self { key }
    }

    pub fn key(&self) -> &TransformKey {
        &self.key
    }

    /// Shape the input array must have.
    pub fn input_shape(&self) -> &[usize] {
        &self.key.out_shape[..self.key.in_rank()]
    }

    /// Apply the transform. Pure: the result depends only on `input`.
    pub fn apply(&self, input: &Tensor) -> Result<Tensor> {
        if input.shape() != self.input_shape() {
            return Err(GroundingError::ShapeMismatch {
                expected: self.input_shape().to_vec(),
                found: input.shape().to_vec(),
            });
        }
        let in_rank = self.key.in_rank();
        let expanded = input.broadcast_trailing(&self.key.out_shape[in_rank..]);
        let out = match &self.key.op {
            TransformOp::Identity => expanded,
            TransformOp::Transpose { axes } => expanded.transpose(axes)?,
            TransformOp::Contract { labels, out_rank } => expanded.contract(labels, *out_rank)?,
        };
        Ok(out)
    }
}

/// Shared append-only table of transforms.
///
/// Readers never block each other. When two callers race to insert the same
/// key the first insertion is kept and both receive it.
#[derive(Debug, Default)]
pub struct TransformCache {
    entries: RwLock<HashMap<TransformKey, Arc<Transform>>>,
}

impl TransformCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &TransformKey) -> Option<Arc<Transform>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    /// Return the cached transform for `key`, inserting it if absent.
    ///
    /// The flag is `true` when the transform was already cached.
    pub fn get_or_insert(&self, key: TransformKey) -> (Arc<Transform>, bool) {
        if let Some(hit) = self.get(&key) {
            return (hit, true);
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.get(&key) {
            Some(existing) => (Arc::clone(existing), true),
            None => {
                let transform = Arc::new(Transform::new(key.clone()));
                entries.insert(key, Arc::clone(&transform));
                (transform, false)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything decided while planning one alignment request.
#[derive(Debug, Clone)]
pub struct AlignmentPlan {
    /// Invocation as written, before removing literals.
    pub original: Signature,
    /// Free-variable axes of the stored array after literal slicing.
    pub input: Signature,
    /// Output axis each input axis (then each new axis) maps to.
    pub permutation: Vec<usize>,
    pub key: TransformKey,
}

/// Plan the transform presenting `pvar(args)` under `sign_out`.
///
/// `params` are the pvariable's declared parameter types and `literals` the
/// positions of `args` bound to literals rather than free variables.
pub fn plan_alignment(
    universe: &ObjectUniverse,
    pvar: &PVarId,
    params: &[TypeId],
    args: &[VarLabel],
    sign_out: &Signature,
    literals: &BTreeSet<usize>,
) -> Result<AlignmentPlan> {
    if args.len() != params.len() {
        return Err(GroundingError::Arity {
            pvar: pvar.clone(),
            expected: params.len(),
            found: args.len(),
        });
    }
    let original: Signature = args.iter().cloned().zip(params.iter().cloned()).collect();
    let input: Signature = args
        .iter()
        .zip(params)
        .enumerate()
        .filter(|(i, _)| !literals.contains(i))
        .map(|(_, (a, t))| (a.clone(), t.clone()))
        .collect();

    let mut permutation: Vec<Option<usize>> = vec![None; input.len()];
    let mut new_dims = Vec::new();
    for (i_out, (label_out, type_out)) in sign_out.iter().enumerate() {
        let mut matched = false;
        for (i_in, (label_in, type_in)) in input.iter().enumerate() {
            if label_in != label_out {
                continue;
            }
            if type_in != type_out {
                return Err(GroundingError::SignatureTypeMismatch {
                    pvar: pvar.clone(),
                    position: i_in + 1,
                    expected: type_in.clone(),
                    argument: label_out.to_string(),
                    found: type_out.clone(),
                });
            }
            permutation[i_in] = Some(i_out);
            matched = true;
        }
        if !matched {
            permutation.push(Some(i_out));
            new_dims.push(universe.cardinality(type_out)?);
        }
    }

    let unresolved: Vec<VarLabel> = input
        .iter()
        .zip(&permutation)
        .filter(|(_, p)| p.is_none())
        .map(|((label, _), _)| label.clone())
        .collect();
    if !unresolved.is_empty() {
        return Err(GroundingError::UnresolvedParameter {
            pvar: pvar.clone(),
            labels: unresolved,
        });
    }
    let permutation: Vec<usize> = permutation.into_iter().flatten().collect();

    let in_shape = universe.shape(&input.types().cloned().collect::<Vec<_>>())?;
    let mut out_shape = in_shape.clone();
    out_shape.extend_from_slice(&new_dims);
    let new_axes: Vec<usize> = (in_shape.len()..out_shape.len()).collect();

    let distinct: BTreeSet<usize> = permutation.iter().copied().collect();
    let is_identity = permutation.iter().enumerate().all(|(i, &p)| i == p)
        && permutation.len() == sign_out.len();
    let op = if distinct.len() != permutation.len() || permutation.len() != sign_out.len() {
        TransformOp::Contract {
            labels: permutation.clone(),
            out_rank: sign_out.len(),
        }
    } else if !is_identity {
        TransformOp::Transpose {
            axes: argsort(&permutation),
        }
    } else {
        TransformOp::Identity
    };

    Ok(AlignmentPlan {
        original,
        input,
        permutation,
        key: TransformKey {
            new_axes,
            out_shape,
            op,
        },
    })
}

/// Inverse of a permutation.
fn argsort(permutation: &[usize]) -> Vec<usize> {
    let mut axes: Vec<usize> = (0..permutation.len()).collect();
    axes.sort_by_key(|&i| permutation[i]);
    axes
}
