//! Tag and attribute names of the HotSpot LogCompilation format.

// Tags
pub const TAG_TASK: &str = "task";
pub const TAG_TASK_QUEUED: &str = "task_queued";
pub const TAG_TASK_DONE: &str = "task_done";
pub const TAG_NMETHOD: &str = "nmethod";
pub const TAG_PARSE: &str = "parse";
pub const TAG_PHASE: &str = "phase";
pub const TAG_BC: &str = "bc";
pub const TAG_CALL: &str = "call";
pub const TAG_METHOD: &str = "method";
pub const TAG_KLASS: &str = "klass";
pub const TAG_TYPE: &str = "type";
pub const TAG_BRANCH: &str = "branch";
pub const TAG_INLINE_SUCCESS: &str = "inline_success";
pub const TAG_INLINE_FAIL: &str = "inline_fail";
pub const TAG_INTRINSIC: &str = "intrinsic";
pub const TAG_ELIMINATE_ALLOCATION: &str = "eliminate_allocation";
pub const TAG_ELIMINATE_LOCK: &str = "eliminate_lock";
pub const TAG_JVMS: &str = "jvms";
pub const TAG_UNCOMMON_TRAP: &str = "uncommon_trap";
pub const TAG_CODE_CACHE: &str = "code_cache";
pub const TAG_CODE_CACHE_FULL: &str = "code_cache_full";
pub const TAG_SWEEPER: &str = "sweeper";
pub const TAG_MAKE_NOT_ENTRANT: &str = "make_not_entrant";
pub const TAG_VM_VERSION: &str = "vm_version";
pub const TAG_NAME: &str = "name";
pub const TAG_RELEASE: &str = "release";
pub const TAG_INFO: &str = "info";
pub const TAG_FRAGMENT: &str = "fragment";

// Attributes
pub const ATTR_METHOD: &str = "method";
pub const ATTR_HOLDER: &str = "holder";
pub const ATTR_RETURN: &str = "return";
pub const ATTR_ARGUMENTS: &str = "arguments";
pub const ATTR_BCI: &str = "bci";
pub const ATTR_CODE: &str = "code";
pub const ATTR_REASON: &str = "reason";
pub const ATTR_ACTION: &str = "action";
pub const ATTR_COMMENT: &str = "comment";
pub const ATTR_NAME: &str = "name";
pub const ATTR_ID: &str = "id";
pub const ATTR_STAMP: &str = "stamp";
pub const ATTR_COMPILE_ID: &str = "compile_id";
pub const ATTR_COMPILER: &str = "compiler";
pub const ATTR_COMPILE_KIND: &str = "compile_kind";
pub const ATTR_LEVEL: &str = "level";
pub const ATTR_BYTES: &str = "bytes";
pub const ATTR_SIZE: &str = "size";
pub const ATTR_INSTS_BYTES: &str = "insts_bytes";
pub const ATTR_ADDRESS: &str = "address";
pub const ATTR_NMSIZE: &str = "nmsize";
pub const ATTR_IICOUNT: &str = "iicount";
pub const ATTR_COUNT: &str = "count";
pub const ATTR_CNT: &str = "cnt";
pub const ATTR_TAKEN: &str = "taken";
pub const ATTR_NOT_TAKEN: &str = "not_taken";
pub const ATTR_PROB: &str = "prob";
pub const ATTR_FREE_CODE_CACHE: &str = "free_code_cache";
pub const ATTR_KIND: &str = "kind";
pub const ATTR_TYPE: &str = "type";
pub const ATTR_LOCK: &str = "lock";
pub const ATTR_SUCCESS: &str = "success";
pub const ATTR_FLAGS: &str = "flags";
pub const ATTR_UNLOADED: &str = "unloaded";

// Attribute values
pub const COMPILE_KIND_OSR: &str = "osr";
pub const COMPILE_KIND_C2N: &str = "c2n";
pub const COMPILER_C1: &str = "C1";
pub const COMPILER_C2: &str = "C2";

pub const INIT_NAME: &str = "<init>";
pub const CLINIT_NAME: &str = "<clinit>";
