//! Buffer layout computed once from an interface or variable descriptor.
//!
//! A [`BufferLayout`] assigns every slot a byte offset and size taken from
//! the declared [`ValueKind`], so the footprint of a block is known before
//! anything is allocated. [`ValueBuffer`] then owns one typed value per
//! value slot, addressed by slot index.
//!
//! ```text
//! connection buffer:  [ DI 0 | DI 1 | ... | DO 0 | DO 1 | ... | adapter handles ]
//! variable buffer:    [ VAR 0 | VAR 1 | ... ]
//! ```

use crate::interface::{InterfaceSpec, VarDecl};
use fb_common::{FbError, FbResult, Value, ValueKind};

/// Bytes reserved for one adapter handle.
pub const ADAPTER_SLOT_SIZE: usize = std::mem::size_of::<usize>();

/// What a slot holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotContent {
    /// A typed value of the given kind.
    Value(ValueKind),
    /// A handle to an adapter instance (sizing only).
    Adapter,
}

/// Position of one slot inside a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// Byte offset from the start of the buffer.
    pub offset: usize,
    /// Size in bytes.
    pub size: usize,
    /// Slot content.
    pub content: SlotContent,
}

/// Offsets and total size of one buffer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BufferLayout {
    slots: Vec<Slot>,
    size: usize,
    value_slots: usize,
}

impl BufferLayout {
    /// Layout of the connection buffer: data inputs, data outputs, adapter handles.
    ///
    /// # Errors
    ///
    /// Returns [`FbError::Layout`] if the total size overflows.
    pub fn connection(spec: &InterfaceSpec) -> FbResult<Self> {
        let mut builder = LayoutBuilder::default();
        for decl in spec.data_inputs().iter().chain(spec.data_outputs()) {
            builder.push_value(decl.kind)?;
        }
        for _ in spec.adapters() {
            builder.push_adapter()?;
        }
        Ok(builder.finish())
    }

    /// Layout of a variable buffer with one slot per declaration.
    ///
    /// # Errors
    ///
    /// Returns [`FbError::Layout`] if the total size overflows.
    pub fn variables(vars: &[VarDecl]) -> FbResult<Self> {
        let mut builder = LayoutBuilder::default();
        for decl in vars {
            builder.push_value(decl.kind)?;
        }
        Ok(builder.finish())
    }

    /// All slots in order.
    #[must_use]
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Total size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of value slots (adapter slots excluded).
    #[must_use]
    pub fn value_slots(&self) -> usize {
        self.value_slots
    }
}

/// Incremental layout construction with checked offsets.
#[derive(Debug, Default)]
pub struct LayoutBuilder {
    layout: BufferLayout,
}

impl LayoutBuilder {
    /// Append a value slot sized for `kind`; returns its slot index.
    ///
    /// # Errors
    ///
    /// Returns [`FbError::Layout`] if the buffer size overflows.
    pub fn push_value(&mut self, kind: ValueKind) -> FbResult<usize> {
        self.layout.value_slots += 1;
        self.push(kind.size(), SlotContent::Value(kind))
    }

    /// Append an adapter handle slot; returns its slot index.
    ///
    /// # Errors
    ///
    /// Returns [`FbError::Layout`] if the buffer size overflows.
    pub fn push_adapter(&mut self) -> FbResult<usize> {
        self.push(ADAPTER_SLOT_SIZE, SlotContent::Adapter)
    }

    fn push(&mut self, size: usize, content: SlotContent) -> FbResult<usize> {
        let offset = self.layout.size;
        self.layout.size = offset
            .checked_add(size)
            .ok_or_else(|| FbError::Layout(format!("buffer size overflow at offset {offset}")))?;
        self.layout.slots.push(Slot {
            offset,
            size,
            content,
        });
        Ok(self.layout.slots.len() - 1)
    }

    /// Finish and return the layout.
    #[must_use]
    pub fn finish(self) -> BufferLayout {
        self.layout
    }
}

/// Owned storage for the value slots of one layout.
///
/// Index `i` addresses the `i`-th value slot; adapter slots hold no value.
#[derive(Debug, Clone, Default)]
pub struct ValueBuffer {
    layout: BufferLayout,
    values: Vec<Value>,
}

impl ValueBuffer {
    /// An unallocated buffer.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Allocate storage for `layout`, each slot holding its kind's default.
    ///
    /// # Errors
    ///
    /// Returns [`FbError::Allocation`] if the layout exceeds `limit` bytes or
    /// the allocator refuses the request.
    pub fn allocate(layout: BufferLayout, limit: usize) -> FbResult<Self> {
        if layout.size() > limit {
            return Err(FbError::Allocation {
                bytes: layout.size(),
                limit,
            });
        }

        let mut values = Vec::new();
        values
            .try_reserve_exact(layout.value_slots())
            .map_err(|_| FbError::Allocation {
                bytes: layout.size(),
                limit,
            })?;
        for slot in layout.slots() {
            if let SlotContent::Value(kind) = slot.content {
                values.push(Value::default_for(kind));
            }
        }
        Ok(Self { layout, values })
    }

    /// Layout this buffer was allocated for.
    #[must_use]
    pub fn layout(&self) -> &BufferLayout {
        &self.layout
    }

    /// Declared footprint in bytes.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.layout.size()
    }

    /// Number of values held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if nothing was allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `index`. Panics if out of range.
    #[inline]
    #[must_use]
    pub fn value(&self, index: usize) -> &Value {
        &self.values[index]
    }

    /// Mutable value at `index`. Panics if out of range.
    #[inline]
    pub fn value_mut(&mut self, index: usize) -> &mut Value {
        &mut self.values[index]
    }

    /// Checked access.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// All values in slot order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }
}
