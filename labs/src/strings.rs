//! Concatenating four short strings
//!
//! Chained `+`, `format!` over locals, a fresh `String` with pushes and a
//! reused buffer. No parameter axes.

use crate::input::{InputSource, alphanumeric};
use steadybench::{
    BenchmarkDefinition, ParameterCombination, Suite, TimeUnit, Workload, WorkloadError,
};

const PIECE_LEN: usize = 32;

/// Four random pieces handed out round-robin, plus the reusable buffer
#[derive(Debug, Clone)]
pub struct StringsContext {
    pieces: [String; 4],
    count: usize,
    reused: String,
}

impl StringsContext {
    fn next(&mut self) -> usize {
        let i = self.count & 3;
        self.count = self.count.wrapping_add(1);
        i
    }

    fn pick(&mut self) -> &str {
        let i = self.next();
        &self.pieces[i]
    }

    /// The random pieces
    pub fn pieces(&self) -> &[String; 4] {
        &self.pieces
    }
}

/// How the four pieces get joined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concat {
    /// `a.to_owned() + b + c + d`, picking inline
    PlusCall,
    /// Pick into locals, then one `format!`
    PlusVar,
    /// New `String` with capacity, four `push_str`
    Builder,
    /// Clear a long-lived buffer, four `push_str`, clone out
    BuilderReused,
}

/// String-building workload
#[derive(Debug, Clone, Copy)]
pub struct StringsLab {
    source: InputSource,
    concat: Concat,
}

impl StringsLab {
    /// Workload timing `concat`
    pub fn new(source: InputSource, concat: Concat) -> Self {
        Self { source, concat }
    }
}

impl Workload for StringsLab {
    type Context = StringsContext;
    type Output = String;

    fn setup(&self, _: &ParameterCombination) -> Result<StringsContext, WorkloadError> {
        let mut rng = self.source.rng();
        Ok(StringsContext {
            pieces: std::array::from_fn(|_| alphanumeric(&mut rng, PIECE_LEN)),
            count: 0,
            reused: String::new(),
        })
    }

    fn invoke(&self, ctx: &mut StringsContext) -> String {
        match self.concat {
            Concat::PlusCall => ctx.pick().to_owned() + ctx.pick() + ctx.pick() + ctx.pick(),
            Concat::PlusVar => {
                let (a, b, c, d) = (ctx.next(), ctx.next(), ctx.next(), ctx.next());
                let p = &ctx.pieces;
                format!("{}{}{}{}", p[a], p[b], p[c], p[d])
            }
            Concat::Builder => {
                let mut out = String::with_capacity(4 * PIECE_LEN);
                for _ in 0..4 {
                    out.push_str(ctx.pick());
                }
                out
            }
            Concat::BuilderReused => {
                ctx.reused.clear();
                for _ in 0..4 {
                    let i = ctx.next();
                    ctx.reused.push_str(&ctx.pieces[i]);
                }
                ctx.reused.clone()
            }
        }
    }
}

/// `plus_call`, `plus_var`, `builder`, `builder_reused`
pub fn suite(source: InputSource) -> Suite {
    [
        ("plus_call", Concat::PlusCall),
        ("plus_var", Concat::PlusVar),
        ("builder", Concat::Builder),
        ("builder_reused", Concat::BuilderReused),
    ]
    .into_iter()
    .fold(Suite::new(), |suite, (name, concat)| {
        suite.with(
            BenchmarkDefinition::new(name, StringsLab::new(source, concat))
                .unit(TimeUnit::Nanoseconds),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_concats_agree() {
        let all = [
            Concat::PlusCall,
            Concat::PlusVar,
            Concat::Builder,
            Concat::BuilderReused,
        ];
        for concat in all {
            let lab = StringsLab::new(InputSource::seeded(9), concat);
            let mut ctx = lab.setup(&ParameterCombination::default()).unwrap();
            let expected = ctx.pieces().concat();

            let first = lab.invoke(&mut ctx);
            assert_eq!(first, expected, "{concat:?}");
            assert_eq!(first.len(), 4 * PIECE_LEN);
            // Four picks per call keep the rotation aligned
            assert_eq!(lab.invoke(&mut ctx), expected, "{concat:?}");
        }
    }

    #[test]
    fn test_suite_has_single_combination_each() {
        let suite = suite(InputSource::entropy());
        assert_eq!(suite.len(), 4);
        for def in suite.definitions() {
            assert_eq!(def.combinations(), vec![ParameterCombination::default()]);
        }
    }
}
