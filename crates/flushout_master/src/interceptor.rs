//! Server-side command interception.

use flushout_document::{Document, Props, Schema};
use flushout_protocol::Command;

/// Rewrites fields a client cannot be trusted to set.
///
/// The master calls the interceptor once per Create or Update command,
/// with the document as it stands just before that command. Returned
/// props are merged over the client's props (interceptor values win) and
/// reported back to the issuing proxy.
///
/// Implementations must not block. Any closure of the right shape is an
/// interceptor:
///
/// ```
/// use flushout_document::{props, Document, Untyped};
/// use flushout_master::Master;
/// use flushout_protocol::{Command, CommandAction, Snapshot};
///
/// let master = Master::with_interceptor(
///     Snapshot::<Untyped>::default(),
///     |_doc: &Document<Untyped>, command: &Command| {
///         (command.action() == CommandAction::Create).then(|| props([("owner", "server")]))
///     },
/// );
/// assert_eq!(master.command_count(), 0);
/// ```
pub trait Interceptor<S: Schema>: Send + Sync {
    /// Returns field values to inject into `command`, if any.
    fn intercept(&self, document: &Document<S>, command: &Command) -> Option<Props>;
}

impl<S, F> Interceptor<S> for F
where
    S: Schema,
    F: Fn(&Document<S>, &Command) -> Option<Props> + Send + Sync,
{
    fn intercept(&self, document: &Document<S>, command: &Command) -> Option<Props> {
        self(document, command)
    }
}

/// An interceptor that never injects anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInterceptor;

impl<S: Schema> Interceptor<S> for NoInterceptor {
    fn intercept(&self, _document: &Document<S>, _command: &Command) -> Option<Props> {
        None
    }
}
