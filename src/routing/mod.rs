// Route dispatch: prefix table, handler groups and the request context

pub mod context;
pub mod dispatcher;
pub mod table;

pub use context::RequestContext;
pub use dispatcher::{Dispatcher, HandlerGroup, RouteHandler};
pub use table::{RouteEntry, RouteTable};
