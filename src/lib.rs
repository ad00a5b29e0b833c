pub mod sqlexpr;

pub use sqlexpr::{
    parse, Classifier, Expression, ExpressionError, ExpressionKind, FieldMap, FunctionCategory,
    FunctionDef, FunctionRegistry, KindFilter, Node, ParseOptions,
};
