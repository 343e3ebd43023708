//! Inline fixtures.
//!
//! `SPIN_LOG` is a JDK 8 LogCompilation file with two compiles of
//! `com.example.Widget.spin(int)`: a C1 compile that is later made not
//! entrant and a C2 compile whose task carries inlining, branch, intrinsic,
//! trap and elimination decisions. `WIDGET_JAVAP` is the matching
//! disassembly.

pub const WIDGET_CLASS: &str = "com.example.Widget";

pub const SPIN_SIGNATURE: &str = "com/example/Widget spin (I)I";

pub const SPIN_LOG: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
<hotspot_log version='160 1' process='4242' time_ms='1700000000000'>
<vm_version>
<name>
Java HotSpot(TM) 64-Bit Server VM
</name>
<release>
25.181-b13
</release>
</vm_version>
<tty>
[Loaded com.example.Widget from file:/tmp/classes/]
<task_queued compile_id='1' method='com/example/Widget spin (I)I' bytes='24' count='256' iicount='256' level='3' stamp='1.000' comment='tiered' hot_count='256'/>
<nmethod compile_id='1' compiler='C1' level='3' entry='0x00007f10' size='800' address='0x00007f00' insts_bytes='400' method='com/example/Widget spin (I)I' bytes='24' count='300' iicount='300' stamp='1.005'/>
<task_queued compile_id='9' method='com/example/Widget spin (I)I' bytes='24' count='5000' iicount='5000' stamp='1.100' comment='tiered' hot_count='5000'/>
<nmethod compile_id='9' compiler='C2' entry='0x00007f90' size='600' address='0x00007f80' insts_bytes='200' method='com/example/Widget spin (I)I' bytes='24' count='5000' iicount='5000' stamp='1.110'/>
<make_not_entrant thread='1' compile_id='1' compiler='C1' level='3' address='0x00007f00' stamp='1.111'/>
<sweeper state='finished' traversals='1' total_blobs='40' nmethods='2' free_code_cache='1048576' stamp='1.500'/>
<tty_done stamp='2.000'/>
</tty>
<compilation_log thread='7'>
<start_compile_thread name='C2 CompilerThread0' thread='7' process='4242' stamp='0.050'/>
<task compile_id='9' method='com/example/Widget spin (I)I' bytes='24' count='5000' stamp='1.101'>
<phase name='parse' nodes='3' live='3' stamp='1.102'>
<type id='1' name='int'/>
<klass id='2' name='com/example/Widget' flags='1'/>
<method id='3' holder='2' name='spin' return='1' arguments='1' flags='1' bytes='24' iicount='5000'/>
<klass id='4' name='java/lang/StringBuilder' flags='17'/>
<type id='5' name='void'/>
<method id='6' holder='4' name='&lt;init&gt;' return='5' flags='1' bytes='7' iicount='800'/>
<method id='7' holder='4' name='length' return='1' flags='1' bytes='5' iicount='12000'/>
<parse method='3' uses='5000' stamp='1.102'>
<bc code='187' bci='0'/>
<bc code='183' bci='4'/>
<call method='6' count='4990' prof_factor='1' inline='1'/>
<inline_success reason='accessor'/>
<parse method='6' uses='4990'>
<bc code='183' bci='1'/>
<uncommon_trap bci='1' reason='null_check' action='none'/>
</parse>
<bc code='158' bci='9'/>
<branch target_bci='20' taken='10' not_taken='4980' cnt='4990' prob='0.002'/>
<bc code='182' bci='13'/>
<call method='7' count='4980' prof_factor='1'/>
<intrinsic id='_length' nodes='4'/>
<uncommon_trap bci='9' reason='unstable_if' action='reinterpret' comment='taken never'/>
<uncommon_trap bci='13' reason='class_check' action='maybe_recompile' method='7'/>
</parse>
</phase>
<eliminate_allocation type='4'>
<jvms bci='0' method='3'/>
</eliminate_allocation>
<eliminate_lock lock='1' kind='coarsened'>
<jvms bci='21' method='3'/>
</eliminate_lock>
<task_done success='1' nmsize='120' count='5000' stamp='1.108'/>
</task>
</compilation_log>
</hotspot_log>
"#;

/// A log cut off by the VM: the `fragment` marker precedes the salvaged tail.
pub const TRUNCATED_LOG: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
<hotspot_log version='160 1' process='4243' time_ms='1700000000000'>
<tty>
<task_queued compile_id='1' method='com/example/Widget spin (I)I' bytes='24' count='256' iicount='256' level='3' stamp='1.000'/>
<fragment>
<![CDATA[
<nmethod compile_id='1' compiler='C1' level='3' method='com/example/Widget spin (I)I' stamp='1.005'/>
]]>
</fragment>
"#;

pub const WIDGET_JAVAP: &str = r#"Classfile /tmp/classes/com/example/Widget.class
  Compiled from "Widget.java"
public class com.example.Widget
  minor version: 0
  major version: 52
{
  public com.example.Widget();
    descriptor: ()V
    flags: (0x0001) ACC_PUBLIC
    Code:
      stack=1, locals=1, args_size=1
         0: aload_0
         1: invokespecial #1                  // Method java/lang/Object."<init>":()V
         4: return
      LineNumberTable:
        line 3: 0

  public int spin(int);
    descriptor: (I)I
    flags: (0x0001) ACC_PUBLIC
    Code:
      stack=3, locals=3, args_size=2
         0: new           #2                  // class java/lang/StringBuilder
         3: dup
         4: invokespecial #3                  // Method java/lang/StringBuilder."<init>":()V
         7: astore_2
         8: iload_1
         9: ifle          20
        12: aload_2
        13: invokevirtual #4                  // Method java/lang/StringBuilder.length:()I
        16: pop
        17: goto          20
        20: aload_0
        21: monitorenter
        22: iload_1
        23: ireturn
      LineNumberTable:
        line 5: 0
        line 6: 8
        line 7: 20
}
"#;

/// Minimal class file declaring `methods` as `(access, name, descriptor)`.
pub fn class_file(internal_name: &str, methods: &[(u16, &str, &str)]) -> Vec<u8> {
    let mut pool: Vec<Vec<u8>> = Vec::new();
    let utf8 = |pool: &mut Vec<Vec<u8>>, s: &str| -> u16 {
        let mut entry = vec![1, (s.len() >> 8) as u8, s.len() as u8];
        entry.extend_from_slice(s.as_bytes());
        pool.push(entry);
        pool.len() as u16
    };

    let name = utf8(&mut pool, internal_name);
    pool.push(vec![7, (name >> 8) as u8, name as u8]);
    let this_class = pool.len() as u16;

    let method_refs: Vec<(u16, u16, u16)> = methods
        .iter()
        .map(|(access, name, descriptor)| (*access, utf8(&mut pool, name), utf8(&mut pool, descriptor)))
        .collect();

    let mut out = vec![0xCA, 0xFE, 0xBA, 0xBE, 0, 0, 0, 52];
    out.extend_from_slice(&(pool.len() as u16 + 1).to_be_bytes());
    for entry in &pool {
        out.extend_from_slice(entry);
    }
    out.extend_from_slice(&0x0021u16.to_be_bytes());
    out.extend_from_slice(&this_class.to_be_bytes());
    // super_class, interfaces_count, fields_count
    out.extend_from_slice(&[0, 0, 0, 0, 0, 0]);
    out.extend_from_slice(&(method_refs.len() as u16).to_be_bytes());
    for (access, name, descriptor) in &method_refs {
        out.extend_from_slice(&access.to_be_bytes());
        out.extend_from_slice(&name.to_be_bytes());
        out.extend_from_slice(&descriptor.to_be_bytes());
        out.extend_from_slice(&[0, 0]);
    }
    // class attributes
    out.extend_from_slice(&[0, 0]);
    out
}

pub fn widget_class_file() -> Vec<u8> {
    class_file(
        "com/example/Widget",
        &[(0x0001, "<init>", "()V"), (0x0001, "spin", "(I)I")],
    )
}
