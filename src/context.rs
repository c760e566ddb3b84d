//! Execution context and instruction layer
//!
//! [`ExecutionContext`] is the seam between the operators and whatever owns
//! the data: resolve named collections and scalars, commit results. The
//! crate ships [`LocalContext`], an in-memory implementation backed by a
//! [`LineageGraph`], which is what the scenario tests and single-process
//! embedders run against.

use std::collections::HashMap;

use crate::characteristics::MatrixCharacteristics;
use crate::collection::MatrixCollection;
use crate::error::{Error, Result};
use crate::lineage::{LineageGraph, LineageId};
use crate::reorg::{self, ReorgOp};

/// A typed scalar operand value
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    /// 64-bit integer
    Int(i64),
    /// Double-precision float
    Double(f64),
    /// Boolean flag
    Bool(bool),
}

impl ScalarValue {
    /// Integer view; integral doubles coerce, everything else is rejected
    pub fn as_i64(&self) -> Result<i64> {
        match self {
            ScalarValue::Int(v) => Ok(*v),
            ScalarValue::Double(v) if v.fract() == 0.0 => Ok(*v as i64),
            other => Err(Error::invalid_argument(
                "scalar",
                format!("{other:?} is not an integer"),
            )),
        }
    }

    /// Boolean view
    pub fn as_bool(&self) -> Result<bool> {
        match self {
            ScalarValue::Bool(v) => Ok(*v),
            other => Err(Error::invalid_argument(
                "scalar",
                format!("{other:?} is not a boolean"),
            )),
        }
    }
}

/// A scalar instruction operand: either a literal or a context variable
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Inline literal value
    Literal(ScalarValue),
    /// Named scalar resolved against the context at process time
    Variable(String),
}

impl Operand {
    /// Literal integer shorthand
    pub fn int(v: i64) -> Self {
        Operand::Literal(ScalarValue::Int(v))
    }

    /// Literal boolean shorthand
    pub fn bool(v: bool) -> Self {
        Operand::Literal(ScalarValue::Bool(v))
    }
}

/// Variable store consumed by instructions
pub trait ExecutionContext {
    /// Characteristics of a named matrix
    fn characteristics(&self, name: &str) -> Result<MatrixCharacteristics>;

    /// Block collection of a named matrix
    fn collection(&self, name: &str) -> Result<&MatrixCollection>;

    /// Commit a result matrix under a name
    fn set_collection(
        &mut self,
        name: &str,
        collection: MatrixCollection,
        mc: MatrixCharacteristics,
    ) -> Result<()>;

    /// Resolve a scalar operand
    fn scalar(&self, operand: &Operand) -> Result<ScalarValue>;

    /// Record that `output` was derived from `input` (default: no tracking)
    fn add_lineage(&mut self, _output: &str, _input: &str) -> Result<()> {
        Ok(())
    }
}

/// Reorg opcode with operands still unresolved
#[derive(Debug, Clone, PartialEq)]
enum InstructionOp {
    Transpose,
    Diag,
    Sort {
        col: Operand,
        descending: Operand,
        index_return: Operand,
    },
}

/// A parsed reorg instruction: opcode, input variable, output variable
#[derive(Debug, Clone, PartialEq)]
pub struct ReorgInstruction {
    op: InstructionOp,
    input: String,
    output: String,
}

impl ReorgInstruction {
    /// Parse an opcode and its operand list into an instruction
    ///
    /// `transpose` and `diag` take no operands; `sort` takes exactly three
    /// (column index, descending flag, index-return flag). Unknown opcodes
    /// are rejected with [`Error::UnsupportedOperation`].
    pub fn from_opcode(
        opcode: &str,
        input: impl Into<String>,
        output: impl Into<String>,
        operands: Vec<Operand>,
    ) -> Result<Self> {
        let op = match opcode {
            "transpose" => {
                require_operands(opcode, &operands, 0)?;
                InstructionOp::Transpose
            }
            "diag" => {
                require_operands(opcode, &operands, 0)?;
                InstructionOp::Diag
            }
            "sort" => {
                require_operands(opcode, &operands, 3)?;
                let mut it = operands.into_iter();
                InstructionOp::Sort {
                    col: it.next().unwrap_or(Operand::int(1)),
                    descending: it.next().unwrap_or(Operand::bool(false)),
                    index_return: it.next().unwrap_or(Operand::bool(false)),
                }
            }
            other => return Err(Error::unsupported(other)),
        };
        Ok(Self {
            op,
            input: input.into(),
            output: output.into(),
        })
    }

    /// Input variable name
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Output variable name
    pub fn output(&self) -> &str {
        &self.output
    }

    fn resolve(&self, ctx: &impl ExecutionContext) -> Result<ReorgOp> {
        Ok(match &self.op {
            InstructionOp::Transpose => ReorgOp::Transpose,
            InstructionOp::Diag => ReorgOp::Diag,
            InstructionOp::Sort {
                col,
                descending,
                index_return,
            } => {
                let col = ctx.scalar(col)?.as_i64()?;
                if col < 1 {
                    return Err(Error::invalid_argument(
                        "col",
                        format!("column index {col} must be positive"),
                    ));
                }
                ReorgOp::Sort {
                    col: col as u64,
                    descending: ctx.scalar(descending)?.as_bool()?,
                    index_return: ctx.scalar(index_return)?.as_bool()?,
                }
            }
        })
    }

    /// Execute against a context: read the input, run the operator, infer
    /// output characteristics, commit the result and its lineage edge
    ///
    /// Errors from any stage abort the instruction before anything is
    /// written to the context.
    pub fn process(&self, ctx: &mut impl ExecutionContext) -> Result<()> {
        let op = self.resolve(ctx)?;
        let mc = ctx.characteristics(&self.input)?;
        let mc_out = reorg::output_characteristics(&op, &mc)?;
        let result = reorg::apply(&op, ctx.collection(&self.input)?, &mc)?;
        ctx.set_collection(&self.output, result, mc_out)?;
        ctx.add_lineage(&self.output, &self.input)
    }
}

fn require_operands(opcode: &str, operands: &[Operand], expected: usize) -> Result<()> {
    if operands.len() != expected {
        return Err(Error::invalid_argument(
            "operands",
            format!(
                "opcode {opcode} takes {expected} operands, got {}",
                operands.len()
            ),
        ));
    }
    Ok(())
}

/// In-memory execution context with lineage tracking
#[derive(Debug, Default)]
pub struct LocalContext {
    matrices: HashMap<String, (MatrixCollection, MatrixCharacteristics)>,
    scalars: HashMap<String, ScalarValue>,
    lineage: LineageGraph,
    nodes: HashMap<String, LineageId>,
}

impl LocalContext {
    /// Empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a named scalar
    pub fn set_scalar(&mut self, name: impl Into<String>, value: ScalarValue) {
        self.scalars.insert(name.into(), value);
    }

    /// Provenance graph over every matrix this context has seen
    pub fn lineage(&self) -> &LineageGraph {
        &self.lineage
    }

    /// Lineage node registered for a matrix name, if any
    pub fn lineage_node(&self, name: &str) -> Option<LineageId> {
        self.nodes.get(name).copied()
    }

    fn node_for(&mut self, name: &str) -> LineageId {
        if let Some(id) = self.nodes.get(name) {
            return *id;
        }
        let id = self.lineage.create(name);
        self.nodes.insert(name.to_string(), id);
        id
    }
}

impl ExecutionContext for LocalContext {
    fn characteristics(&self, name: &str) -> Result<MatrixCharacteristics> {
        self.matrices
            .get(name)
            .map(|(_, mc)| *mc)
            .ok_or_else(|| Error::invalid_argument("name", format!("unknown matrix {name}")))
    }

    fn collection(&self, name: &str) -> Result<&MatrixCollection> {
        self.matrices
            .get(name)
            .map(|(c, _)| c)
            .ok_or_else(|| Error::invalid_argument("name", format!("unknown matrix {name}")))
    }

    fn set_collection(
        &mut self,
        name: &str,
        collection: MatrixCollection,
        mc: MatrixCharacteristics,
    ) -> Result<()> {
        self.matrices.insert(name.to_string(), (collection, mc));
        self.node_for(name);
        Ok(())
    }

    fn scalar(&self, operand: &Operand) -> Result<ScalarValue> {
        match operand {
            Operand::Literal(v) => Ok(v.clone()),
            Operand::Variable(name) => self
                .scalars
                .get(name)
                .cloned()
                .ok_or_else(|| {
                    Error::invalid_argument("name", format!("unknown scalar {name}"))
                }),
        }
    }

    fn add_lineage(&mut self, output: &str, input: &str) -> Result<()> {
        let parent = self.node_for(output);
        let child = self.node_for(input);
        self.lineage.add_child(parent, child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::MatrixBlock;
    use crate::index::BlockIndex;

    fn ctx_with(name: &str, values: Vec<f64>) -> LocalContext {
        let rows = values.len();
        let blocks = vec![(
            BlockIndex::new(1, 1),
            MatrixBlock::column_from_values(values),
        )];
        let mut ctx = LocalContext::new();
        ctx.set_collection(
            name,
            MatrixCollection::from_blocks(blocks, 2),
            MatrixCharacteristics::new(rows as u64, 1, 8, 8),
        )
        .unwrap();
        ctx
    }

    #[test]
    fn test_unknown_opcode() {
        assert!(matches!(
            ReorgInstruction::from_opcode("reshape", "A", "B", vec![]),
            Err(Error::UnsupportedOperation { .. })
        ));
    }

    #[test]
    fn test_operand_arity() {
        assert!(matches!(
            ReorgInstruction::from_opcode("transpose", "A", "B", vec![Operand::int(1)]),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(matches!(
            ReorgInstruction::from_opcode("sort", "A", "B", vec![Operand::int(1)]),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_process_commits_output_and_lineage() {
        let mut ctx = ctx_with("A", vec![3.0, 1.0, 2.0]);
        let instr = ReorgInstruction::from_opcode(
            "sort",
            "A",
            "B",
            vec![Operand::int(1), Operand::bool(false), Operand::bool(true)],
        )
        .unwrap();
        instr.process(&mut ctx).unwrap();

        let mc = ctx.characteristics("B").unwrap();
        assert_eq!((mc.rows(), mc.cols(), mc.nnz()), (3, 1, 3));

        // B depends on A, so A must not be evictable until B releases it.
        let a = ctx.lineage_node("A").unwrap();
        assert!(!ctx.lineage().is_evictable(a).unwrap());
        let b = ctx.lineage_node("B").unwrap();
        assert_eq!(ctx.lineage().children(b).unwrap(), &[a]);
    }

    #[test]
    fn test_sort_operands_from_named_scalars() {
        let mut ctx = ctx_with("A", vec![3.0, 1.0, 2.0]);
        ctx.set_scalar("k", ScalarValue::Int(1));
        ctx.set_scalar("desc", ScalarValue::Bool(true));
        let instr = ReorgInstruction::from_opcode(
            "sort",
            "A",
            "B",
            vec![
                Operand::Variable("k".into()),
                Operand::Variable("desc".into()),
                Operand::bool(false),
            ],
        )
        .unwrap();
        instr.process(&mut ctx).unwrap();

        let out = ctx.collection("B").unwrap();
        let mut got: Vec<f64> = Vec::new();
        for (_, blk) in out.iter() {
            got.extend(blk.to_dense());
        }
        assert_eq!(got, vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_scalar_coercions() {
        assert_eq!(ScalarValue::Double(4.0).as_i64().unwrap(), 4);
        assert!(ScalarValue::Double(4.5).as_i64().is_err());
        assert!(ScalarValue::Int(1).as_bool().is_err());
    }
}
