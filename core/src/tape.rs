//! Explicit recording of evaluated ops, for later back-propagation.
use std::fmt;

use downcast_rs::Downcast as _;

use crate::internal::*;

/// One evaluated op, with the tensors it consumed and produced.
#[derive(Clone, Debug)]
pub struct OpRecord {
    pub name: String,
    pub op: Arc<dyn GradOp>,
    pub inputs: TVec<Arc<Tensor>>,
    pub outputs: TVec<Arc<Tensor>>,
}

impl OpRecord {
    pub fn op_as<O: Op>(&self) -> Option<&O> {
        (*self.op).as_any().downcast_ref::<O>()
    }
}

impl fmt::Display for OpRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.op.name())
    }
}

/// A caller-owned list of `OpRecord`s, in evaluation order.
#[derive(Clone, Debug, Default)]
pub struct Tape {
    records: Vec<OpRecord>,
}

impl Tape {
    pub fn new() -> Tape {
        Tape::default()
    }

    /// Push a record, returning its index.
    pub fn record(
        &mut self,
        name: impl Into<String>,
        op: impl GradOp,
        inputs: TVec<Arc<Tensor>>,
        outputs: TVec<Arc<Tensor>>,
    ) -> usize {
        let record = OpRecord { name: name.into(), op: Arc::new(op), inputs, outputs };
        trace!("Recording #{} {}", self.records.len(), record);
        self.records.push(record);
        self.records.len() - 1
    }

    pub fn records(&self) -> &[OpRecord] {
        &self.records
    }

    pub fn record_at(&self, ix: usize) -> LrnResult<&OpRecord> {
        self.records
            .get(ix)
            .with_context(|| format!("No record #{} on a tape of {}", ix, self.records.len()))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Gradients with respect to the inputs of record `ix`, given gradients
    /// flowing into each of its outputs.
    pub fn grad(
        &self,
        ix: usize,
        output_grads: TVec<Arc<Tensor>>,
    ) -> LrnResult<TVec<Arc<Tensor>>> {
        let record = self.record_at(ix)?;
        ensure!(
            output_grads.len() == record.outputs.len(),
            "{} has {} outputs, got {} gradients",
            record,
            record.outputs.len(),
            output_grads.len()
        );
        debug!("Back-propagating through #{} {}", ix, record);
        record.op.grad(&record.inputs, &record.outputs, output_grads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorded() -> (Tape, Arc<Tensor>) {
        let lrn = Lrn::new(1, 1.0, 1.0, 0.5, LrnRegion::AcrossChannels);
        let x = tensor4(&[[[[1f64, 2., 3.]]]]).into_arc_tensor();
        let y = lrn.eval(tvec!(x.clone())).unwrap();
        let mut tape = Tape::new();
        assert_eq!(tape.record("lrn_0", lrn, tvec!(x.clone()), y), 0);
        (tape, x)
    }

    #[test]
    fn records_in_order() {
        let (tape, x) = recorded();
        assert_eq!(tape.len(), 1);
        let record = tape.record_at(0).unwrap();
        assert_eq!(record.to_string(), "lrn_0 (Lrn)");
        assert_eq!(record.inputs[0], x);
        assert_eq!(record.op_as::<Lrn>().unwrap().radius, 1);
        assert!(record.op_as::<LrnGrad>().is_none());
        assert!(tape.record_at(1).is_err());
    }

    #[test]
    fn grad_goes_through_the_recorded_op() {
        let (tape, x) = recorded();
        let dy = tensor4(&[[[[1f64, 0., 0.]]]]).into_arc_tensor();
        let dx = tape.grad(0, tvec!(dy.clone())).unwrap();
        let lrn = tape.record_at(0).unwrap().op_as::<Lrn>().unwrap().clone();
        let expected = LrnGrad::new(lrn).backward(&x, &dy).unwrap();
        dx[0].close_enough(&expected, Approximation::Exact).unwrap();
        assert!(tape.grad(0, tvec!()).is_err());
    }
}
