//! The JIT data model.
//!
//! Packages, classes and members live in index arenas owned by
//! [`PackageManager`]; [`JitDataModel`] wraps them with the session-wide
//! timeline, code-cache samples and [`JitStats`] behind one read/write lock.

pub mod assembly;
pub mod compilation;
pub mod errors;
pub mod events;
pub mod member;
pub mod model;
pub mod package;
pub mod stats;

pub use assembly::{AssemblyBlock, AssemblyProvider, MapAssemblyProvider, NoAssembly};
pub use compilation::{parse_stamp_millis, CompileKind, Compilation};
pub use errors::ModelError;
pub use events::{CodeCacheEvent, CodeCacheEventKind, JitEvent, JitEventKind, VmVersion};
pub use member::{MemberCore, MetaConstructor, MetaMember, MetaMethod, ATTR_COMPILE_MILLIS};
pub use model::JitDataModel;
pub use package::{BytecodeCell, ClassId, MemberId, MetaClass, MetaPackage, PackageId, PackageManager};
pub use stats::{CompiledEvent, JitStats};
