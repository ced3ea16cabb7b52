//! Process context shared by the generator and the engine
//!
//! A [`Process`] owns everything one running program needs besides its
//! threads: class metadata, the heap, console output and options. It is
//! passed explicitly by `&mut` instead of living in globals.

use super::builtins;
use super::object::ClassId;
use super::{ClassRegistry, EngineOptions, Heap, ObjectRef, Value, VmResult};
use crate::types::Type;
use std::io::Write;

/// Console output of a process
#[derive(Debug, Default)]
pub struct Console {
    buffer: String,
    echo: bool,
}

impl Console {
    /// Console that also writes to stdout
    pub fn echoing() -> Self {
        Self {
            buffer: String::new(),
            echo: true,
        }
    }

    /// Append text
    pub fn write(&mut self, text: &str) {
        self.buffer.push_str(text);
        if self.echo {
            let mut stdout = std::io::stdout().lock();
            // console echo is best effort
            let _ = stdout.write_all(text.as_bytes());
            let _ = stdout.flush();
        }
    }

    /// Everything written so far
    pub fn output(&self) -> &str {
        &self.buffer
    }

    /// Take the buffered output
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.buffer)
    }
}

/// One program's runtime context
#[derive(Debug)]
pub struct Process {
    /// Class and method metadata
    pub classes: ClassRegistry,
    /// Instances and arrays
    pub heap: Heap,
    /// Console output
    pub console: Console,
    /// Options
    pub options: EngineOptions,
    /// Depth of nested synchronous runs started by natives
    pub(crate) nested_runs: usize,
}

impl Process {
    /// Create a process with the system module installed
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    /// Create a process with the given options
    pub fn with_options(options: EngineOptions) -> Self {
        let mut process = Self {
            classes: ClassRegistry::new(),
            heap: Heap::new(),
            console: Console::default(),
            options,
            nested_runs: 0,
        };
        builtins::install(&mut process.classes);
        process
    }

    /// Instantiate a class
    pub fn instantiate(&mut self, class: ClassId) -> VmResult<ObjectRef> {
        self.heap.instantiate(class, &self.classes)
    }

    /// Singleton instance of a class's static companion
    ///
    /// Created on first use and cached on the companion's metadata.
    pub fn static_object(&mut self, class: ClassId) -> VmResult<ObjectRef> {
        let descriptor = self.classes.class(class)?;
        let companion = if descriptor.is_static() {
            class
        } else {
            descriptor.static_class.unwrap_or(class)
        };
        if let Some(cached) = self.classes.class(companion)?.class_object {
            return Ok(cached);
        }
        let object = self.heap.instantiate(companion, &self.classes)?;
        if let Some(descriptor) = self.classes.get_class_mut(companion) {
            descriptor.class_object = Some(object);
        }
        Ok(object)
    }

    /// Dynamic class of a value (`None` for `null` and arrays)
    pub fn class_of(&self, value: &Value) -> Option<ClassId> {
        match value {
            Value::Null | Value::Array(_) => None,
            Value::Int(_) => Some(ClassId::INTEGER),
            Value::Float(_) => Some(ClassId::FLOAT),
            Value::Double(_) => Some(ClassId::DOUBLE),
            Value::Bool(_) => Some(ClassId::BOOLEAN),
            Value::Char(_) => Some(ClassId::CHARACTER),
            Value::Str(_) => Some(ClassId::STRING),
            Value::Object(r) => self.heap.object(*r).ok().map(|o| o.class_id),
        }
    }

    /// Display text of a value using the configured length budget
    pub fn format(&self, value: &Value, ty: &Type) -> String {
        ty.format(value, self.options.format_max_length, &self.heap, &self.classes)
    }
}

impl Default for Process {
    fn default() -> Self {
        Self::new()
    }
}
