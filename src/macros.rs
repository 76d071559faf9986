/// Scoped graph construction: binds a `GraphBuilder` over `$graph` for the
/// body and yields the body's value.
#[macro_export]
macro_rules! model {
    ($graph:expr, |$builder:ident| $($body:tt)*) => {{
        let mut $builder = $crate::graph::dsl::GraphBuilder::new($graph);
        $($body)*
    }};
}

/// Dense layer: lowers `linear!(g, &x, &w, &b)` to matmul + add through
/// the builder, propagating build-time shape errors.
#[macro_export]
macro_rules! linear {
    ($builder:ident, $x:expr, $w:expr, $b:expr) => {
        $builder
            .matmul($x, $w)
            .and_then(|xw| $builder.add(&xw, $b))
    };
}
