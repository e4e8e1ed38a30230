use futures::{stream::Map, Stream, StreamExt};

/// Transforms every item of `stream` with `f`, preserving order and
/// termination.
pub fn map<S, F, B>(stream: S, f: F) -> Map<S, F>
where
    S: Stream,
    F: FnMut(S::Item) -> B,
{
    stream.map(f)
}
