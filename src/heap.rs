// File: src/heap.rs
//
// Object heap for the Moss VM: a slot arena addressed by ObjRef handles,
// an intrusive list threading every live object, the string intern table,
// and the tri-color mark-sweep collector.
//
// The heap never initiates a collection on its own; the VM and the
// compiler call `collect` through their allocation helpers so the root
// set (stacks, globals, open upvalues, compiler chain) is always in
// scope. The collector is stop-the-world, so no write barriers exist.

use ahash::AHashMap;
use std::rc::Rc;

use crate::object::{Obj, ObjClosure, ObjFunction, ObjKind, ObjRef, ObjString, ObjUpvalue};
use crate::value::{format_number, Value};

/// First collection once this many bytes are live.
const GC_FIRST_THRESHOLD: usize = 1024 * 1024;
/// After a collection the next threshold is live bytes times this.
const GC_HEAP_GROW_FACTOR: usize = 2;

pub struct Heap {
    slots: Vec<Option<Obj>>,
    free: Vec<u32>,
    /// Most recently allocated object; `Obj::next` links the rest.
    head: Option<ObjRef>,
    /// Weak map from string content to its unique interned object.
    strings: AHashMap<Rc<str>, ObjRef>,
    /// Mark-phase worklist: reachable objects whose children are not yet
    /// processed.
    gray: Vec<ObjRef>,
    bytes_allocated: usize,
    next_gc: usize,
    stress: bool,
}

impl Heap {
    pub fn new() -> Self {
        Heap {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            strings: AHashMap::new(),
            gray: Vec::new(),
            bytes_allocated: 0,
            next_gc: GC_FIRST_THRESHOLD,
            stress: false,
        }
    }

    /// Forces a collection before every allocation request.
    pub fn set_stress(&mut self, stress: bool) {
        self.stress = stress;
    }

    pub fn should_collect(&self) -> bool {
        self.stress || self.bytes_allocated > self.next_gc
    }

    pub fn bytes_allocated(&self) -> usize {
        self.bytes_allocated
    }

    // ── Allocation ────────────────────────────────────────────────────

    /// The single allocation funnel: accounts for the new object and
    /// threads it onto the all-objects list. Callers that can collect
    /// must do so *before* calling this.
    pub fn alloc(&mut self, kind: ObjKind) -> ObjRef {
        self.bytes_allocated += shallow_size(&kind);
        let obj = Obj { marked: false, next: self.head, kind };
        let index = match self.free.pop() {
            Some(slot) => {
                self.slots[slot as usize] = Some(obj);
                slot
            }
            None => {
                self.slots.push(Some(obj));
                (self.slots.len() - 1) as u32
            }
        };
        let reference = ObjRef(index);
        self.head = Some(reference);
        reference
    }

    /// Interns a string, returning the existing object when the content
    /// is already known.
    pub fn intern(&mut self, text: &str) -> ObjRef {
        if let Some(&existing) = self.strings.get(text) {
            return existing;
        }
        self.intern_new(Rc::from(text))
    }

    /// Interning counterpart that adopts an already-built string, used by
    /// concatenation.
    pub fn intern_owned(&mut self, text: String) -> ObjRef {
        if let Some(&existing) = self.strings.get(text.as_str()) {
            return existing;
        }
        self.intern_new(Rc::from(text))
    }

    fn intern_new(&mut self, chars: Rc<str>) -> ObjRef {
        let reference = self.alloc(ObjKind::String(ObjString { chars: Rc::clone(&chars) }));
        self.strings.insert(chars, reference);
        reference
    }

    // ── Access ────────────────────────────────────────────────────────

    pub fn obj(&self, r: ObjRef) -> &Obj {
        match &self.slots[r.0 as usize] {
            Some(obj) => obj,
            None => panic!("use of freed object {:?}", r),
        }
    }

    fn obj_mut(&mut self, r: ObjRef) -> &mut Obj {
        match &mut self.slots[r.0 as usize] {
            Some(obj) => obj,
            None => panic!("use of freed object {:?}", r),
        }
    }

    pub fn str_value(&self, r: ObjRef) -> &str {
        match &self.obj(r).kind {
            ObjKind::String(s) => &s.chars,
            _ => panic!("object {:?} is not a string", r),
        }
    }

    pub fn is_string(&self, r: ObjRef) -> bool {
        matches!(self.obj(r).kind, ObjKind::String(_))
    }

    pub fn function(&self, r: ObjRef) -> &ObjFunction {
        match &self.obj(r).kind {
            ObjKind::Function(f) => f,
            _ => panic!("object {:?} is not a function", r),
        }
    }

    pub fn function_mut(&mut self, r: ObjRef) -> &mut ObjFunction {
        match &mut self.obj_mut(r).kind {
            ObjKind::Function(f) => f,
            _ => panic!("object {:?} is not a function", r),
        }
    }

    pub fn closure(&self, r: ObjRef) -> &ObjClosure {
        match &self.obj(r).kind {
            ObjKind::Closure(c) => c,
            _ => panic!("object {:?} is not a closure", r),
        }
    }

    pub fn closure_mut(&mut self, r: ObjRef) -> &mut ObjClosure {
        match &mut self.obj_mut(r).kind {
            ObjKind::Closure(c) => c,
            _ => panic!("object {:?} is not a closure", r),
        }
    }

    pub fn upvalue(&self, r: ObjRef) -> &ObjUpvalue {
        match &self.obj(r).kind {
            ObjKind::Upvalue(u) => u,
            _ => panic!("object {:?} is not an upvalue", r),
        }
    }

    pub fn upvalue_mut(&mut self, r: ObjRef) -> &mut ObjUpvalue {
        match &mut self.obj_mut(r).kind {
            ObjKind::Upvalue(u) => u,
            _ => panic!("object {:?} is not an upvalue", r),
        }
    }

    /// Whether the slot behind `r` is still occupied. Meaningful right
    /// after a collection, before the slot can be reused.
    pub fn contains(&self, r: ObjRef) -> bool {
        self.slots.get(r.0 as usize).map_or(false, |slot| slot.is_some())
    }

    // ── Display ───────────────────────────────────────────────────────

    pub fn format_value(&self, value: Value) -> String {
        match value {
            Value::Nil => "nil".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(n),
            Value::Obj(r) => match &self.obj(r).kind {
                ObjKind::String(s) => s.chars.to_string(),
                ObjKind::Function(f) => self.format_function(f),
                ObjKind::Closure(c) => self.format_function(self.function(c.function)),
                ObjKind::Upvalue(_) => "upvalue".to_string(),
                ObjKind::Native(_) => "<native fn>".to_string(),
            },
        }
    }

    fn format_function(&self, function: &ObjFunction) -> String {
        match function.name {
            Some(name) => format!("<fn {}>", self.str_value(name)),
            None => "<script>".to_string(),
        }
    }

    // ── Collection ────────────────────────────────────────────────────

    pub fn mark_value(&mut self, value: Value) {
        if let Value::Obj(r) = value {
            self.mark_object(r);
        }
    }

    pub fn mark_object(&mut self, r: ObjRef) {
        let obj = self.obj_mut(r);
        if obj.marked {
            return;
        }
        obj.marked = true;
        self.gray.push(r);
    }

    /// Drains the gray worklist, blackening each object by marking its
    /// outgoing references.
    pub fn trace_references(&mut self) {
        while let Some(r) = self.gray.pop() {
            self.blacken(r);
        }
    }

    fn blacken(&mut self, r: ObjRef) {
        let mut child_objects: Vec<ObjRef> = Vec::new();
        let mut child_values: Vec<Value> = Vec::new();
        match &self.obj(r).kind {
            ObjKind::String(_) | ObjKind::Native(_) => {}
            ObjKind::Upvalue(ObjUpvalue::Open(_)) => {}
            ObjKind::Upvalue(ObjUpvalue::Closed(value)) => child_values.push(*value),
            ObjKind::Function(f) => {
                if let Some(name) = f.name {
                    child_objects.push(name);
                }
                child_values.extend_from_slice(&f.chunk.constants);
            }
            ObjKind::Closure(c) => {
                child_objects.push(c.function);
                child_objects.extend_from_slice(&c.upvalues);
            }
        }
        for child in child_objects {
            self.mark_object(child);
        }
        for value in child_values {
            self.mark_value(value);
        }
    }

    /// Drops intern-table entries whose string is about to be swept. The
    /// table holds its keys weakly; without this step a dead string would
    /// be resurrected by the next lookup.
    pub fn sweep_interned(&mut self) {
        let slots = &self.slots;
        self.strings.retain(|_, r| {
            slots[r.0 as usize].as_ref().map_or(false, |obj| obj.marked)
        });
    }

    /// Frees every unmarked object, clears the marks on survivors, and
    /// raises the next collection threshold.
    pub fn sweep(&mut self) {
        let mut previous: Option<ObjRef> = None;
        let mut current = self.head;
        while let Some(r) = current {
            let (marked, next) = {
                let obj = self.obj(r);
                (obj.marked, obj.next)
            };
            if marked {
                self.obj_mut(r).marked = false;
                previous = Some(r);
            } else {
                match previous {
                    Some(p) => self.obj_mut(p).next = next,
                    None => self.head = next,
                }
                self.free_object(r);
            }
            current = next;
        }
        self.next_gc = self.bytes_allocated * GC_HEAP_GROW_FACTOR;
    }

    fn free_object(&mut self, r: ObjRef) {
        let obj = self.slots[r.0 as usize].take();
        if let Some(obj) = obj {
            self.bytes_allocated = self.bytes_allocated.saturating_sub(shallow_size(&obj.kind));
            self.free.push(r.0);
        }
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

/// Byte estimate for accounting, measured at allocation time. A
/// function's chunk grows while the compiler fills it; the estimate does
/// not chase that growth, it only steers the collection trigger.
fn shallow_size(kind: &ObjKind) -> usize {
    let base = std::mem::size_of::<Obj>();
    base + match kind {
        ObjKind::String(s) => s.chars.len(),
        ObjKind::Function(f) => {
            f.chunk.code.len() + f.chunk.constants.len() * std::mem::size_of::<Value>()
        }
        ObjKind::Closure(c) => c.upvalues.len() * std::mem::size_of::<ObjRef>(),
        ObjKind::Upvalue(_) | ObjKind::Native(_) => 0,
    }
}
